pub mod api;
pub mod events;
pub mod startup;

pub mod prelude {
    pub use super::api::ApiError;
    pub use super::events::EventsError;
    pub use super::startup::StartupError;
}
