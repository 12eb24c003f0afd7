use sheetform_common::LabelName;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown label {0}")]
    UnknownLabel(LabelName),
    #[error("label {0} refers back to itself")]
    LabelCycle(LabelName),
}
