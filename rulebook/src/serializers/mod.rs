mod json;

pub use json::{
    facts_from_json, facts_from_str, program_from_json, program_from_value, program_to_json,
    result_to_json,
};
