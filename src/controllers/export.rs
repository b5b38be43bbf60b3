use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{owned_form, ResponseFilter};
use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::services::export::{export_csv, export_filename};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/events/{id}/export", get(export_responses))
}

/// Content-Disposition с ASCII-именем для старых клиентов и `filename*` (RFC 5987)
/// с исходным UTF-8 именем.
fn disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            ' ' => ' ',
            c if c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

// GET /api/events/{id}/export?search=&period=
async fn export_responses(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Query(filter): Query<ResponseFilter>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let form = owned_form(&state, event_id, &user).await?;
    let offset = state.config.report_offset();

    let responses = state.store.list_responses(event_id).await?;
    let selected = filter.apply(&responses, Utc::now(), &offset);
    let csv = export_csv(&form, selected.iter().copied(), &offset);

    tracing::info!(
        "Exported {} responses of event {}",
        selected.len(),
        event_id
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                disposition(&export_filename(&form.event.title)),
            ),
        ],
        csv,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_names_are_kept_in_both_parameters() {
        assert_eq!(
            disposition("Rust Meetup_responses.csv"),
            "attachment; filename=\"Rust Meetup_responses.csv\"; \
             filename*=UTF-8''Rust%20Meetup_responses.csv"
        );
    }

    #[test]
    fn non_ascii_names_are_percent_encoded() {
        let header = disposition(&export_filename("Inscrição 2025"));
        assert!(header.is_ascii());
        assert!(header.contains("filename=\"Inscri__o 2025_responses.csv\""));
        assert!(header.contains("filename*=UTF-8''Inscri%C3%A7%C3%A3o%202025_responses.csv"));
    }
}
