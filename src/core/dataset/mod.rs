mod label;
mod split;

pub use label::{
    label_file_name, parse_label_file, parse_label_text, DetectionRecord, LabelInfo,
    LABEL_EXTENSION,
};
pub use split::DatasetSplit;
