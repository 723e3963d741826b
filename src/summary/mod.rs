pub mod fields;
pub mod survey;
pub mod table;

pub use fields::{standard_fields, Coercion, SummaryField, SummaryRecord, SummaryValue};
pub use survey::{run_survey, SurveyConfig, SurveyResult};
