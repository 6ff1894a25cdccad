pub mod application_service;
pub mod application_workflow;
pub mod error;
pub mod expiration_sweeper;
pub mod job_state_machine;
pub mod notification_service;

#[cfg(test)]
mod test_support;
