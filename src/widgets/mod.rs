pub mod antd;
pub mod college;
pub mod date_picker;
pub mod multi_select;
pub mod select;
pub mod ui;

pub use antd::{FieldOrdinal, FieldRef, Scope};
pub use college::CollegeSearch;
pub use date_picker::{MonthPicker, YearMonth};
pub use multi_select::{MultiSelect, PickedValue};
pub use select::{OptionMatch, SearchableSelect, SelectField, SelectOptions, SelectState, Selection};
pub use ui::{close_ui, wait_for_ui_stable};
