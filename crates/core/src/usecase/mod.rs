pub mod compose;
pub mod dispatcher;
pub mod focus_resolver;
pub mod relay;
pub mod rewrite_action;
pub mod text_replacer;
pub mod widgets;
