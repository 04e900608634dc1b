pub mod designer;
pub mod form_design;
pub mod form_design_history;
pub mod form_design_tag;
pub mod form_state;
pub mod history_designer;
pub mod history_form_state;
pub mod history_processor;
pub mod processor;
pub mod submission;
pub mod tag;
