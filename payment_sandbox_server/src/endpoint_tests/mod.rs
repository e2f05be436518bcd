mod consents;
mod enrollments;
pub mod helpers;
mod payments;
