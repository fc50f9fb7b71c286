pub mod header;
pub mod hp;
pub mod json;
pub mod model;
pub mod reader;
pub mod writer;

pub use header::{Endian, FumenHeader};
pub use hp::HpTable;
pub use json::FumenJson;
pub use model::{FumenBranch, FumenCourse, FumenMeasure, FumenNote};
pub use reader::FumenReader;
pub use writer::FumenWriter;
