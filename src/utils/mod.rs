// Utilities shared by the lifecycle and framework adapters

pub mod history;
pub mod results;

pub use history::history_id;
pub use results::{
    create_link, first_non_empty, host_label, host_name, panic_message, status_details_from_error,
    status_from_panic, thread_label, thread_name,
};
