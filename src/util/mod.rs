pub use bounded_queue::BoundedQueue;
pub(crate) use registration::Registration;

mod bounded_queue;
mod registration;
