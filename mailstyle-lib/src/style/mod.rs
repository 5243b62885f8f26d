pub mod cache;
pub mod css_matcher;
pub mod declarations;
pub mod inliner;
pub mod merge;
pub mod owned_css;
pub mod preprocess;
pub mod pseudo;
pub mod rules;
pub mod specificity;
