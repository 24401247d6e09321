pub mod comment;
pub mod date_proposal;
pub mod notification;
pub mod trip;
