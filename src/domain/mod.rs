mod waitlist_email;

pub use waitlist_email::matches_permissive_shape;
pub use waitlist_email::{EmailPolicy, WaitlistEmail};
