pub mod user;
pub mod event;
pub mod form;
pub mod response;
pub mod subscription;

pub use user::{NewUser, User};
pub use event::{Event, EventSummary, NewEvent};
pub use form::{EventForm, Field, FieldType, NewField, NewSection, Section};
pub use response::{AnswerValue, Answers, FormResponse, NewResponse};
pub use subscription::{Plan, Subscription, SubscriptionStatus};
