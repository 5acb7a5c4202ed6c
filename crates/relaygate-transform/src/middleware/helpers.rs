use super::types::{Proto, TransformError};

pub(crate) fn ensure_generate_proto(_proto: Proto) -> Result<(), TransformError> {
    Ok(())
}
