pub mod csv_loader;

pub use csv_loader::{
    load_input_records, load_previous_output, parse_input_records, parse_previous_output,
    PreviousRow,
};
