//! Verbose artifact checkpoints written between stages.

use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use modcat_core::CombinedArtifact;

use crate::error::Result;

/// Writes `artifact` as pretty-printed JSON.
pub fn write_artifact(path: impl AsRef<Path>, artifact: &CombinedArtifact) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, artifact)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    tracing::debug!(
        path = %path.as_ref().display(),
        types = artifact.types.len(),
        modules = artifact.modules.len(),
        "checkpoint written"
    );
    Ok(())
}

/// Reads a verbose artifact checkpoint.
pub fn read_artifact(path: impl AsRef<Path>) -> Result<CombinedArtifact> {
    let file = std::fs::File::open(path)?;
    let artifact = serde_json::from_reader(BufReader::new(file))?;
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modcat_core::{Field, ModuleEntry, ModuleKind, SchemaType, SourceLocation};

    #[test]
    fn test_write_read_preserves_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.json");

        let mut artifact = CombinedArtifact::new("0.4.0");
        artifact.insert_type(
            SchemaType::new("bess.pb.QueueArg", "protobuf/module_msg.proto")
                .with_field(Field::scalar("size", "uint64")),
        );
        let mut queue = ModuleEntry::new("Queue", ModuleKind::Mclass);
        queue.arg = Some("bess.pb.QueueArg".into());
        queue.location = Some(SourceLocation::new("modules/queue.cc", 57));
        artifact.modules.push(queue);

        write_artifact(&path, &artifact).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"modules\""));
        assert_eq!(read_artifact(&path).unwrap(), artifact);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_artifact(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, crate::StoreError::IoError(_)));
    }
}
