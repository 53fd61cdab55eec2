use std::path::Path;

use modcat_core::{
    Command, CombinedArtifact, Field, ModuleEntry, ModuleKind, SchemaType, SourceLocation, prune,
};
use modcat_db::{
    Manifest, Stage, StoreError, compact, expand, read_artifact, read_compact, write_artifact,
    write_compact,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn linked_artifact() -> CombinedArtifact {
    let mut artifact = CombinedArtifact::new("0.4.0-dev");
    let mut rule = SchemaType::new("bess.pb.ACLArg.Rule", "protobuf/module_msg.proto")
        .with_field(Field::scalar("src_ip", "string"));
    rule.line = Some(77);
    artifact.insert_type(rule);
    artifact.insert_type(
        SchemaType::new("bess.pb.ACLArg", "protobuf/module_msg.proto")
            .with_field(Field::message("rules", "bess.pb.ACLArg.Rule").repeated()),
    );
    artifact.insert_type(SchemaType::new("bess.pb.EmptyArg", "protobuf/bess_msg.proto"));
    artifact.insert_type(SchemaType::new("sample.plugin.Orphan", "plugins/sample/sample.proto"));

    let mut acl = ModuleEntry::new("ACL", ModuleKind::Mclass);
    acl.arg = Some("bess.pb.ACLArg".into());
    acl.location = Some(SourceLocation::new("core/modules/acl.cc", 41));
    acl.examples = vec![SourceLocation::new("bessctl/conf/samples/acl.bess", 5)];
    let mut clear = Command::new("clear", "EmptyArg");
    clear.arg_type = Some("bess.pb.EmptyArg".into());
    clear.location = Some(SourceLocation::new("core/modules/acl.cc", 120));
    artifact.modules.push(acl.with_command(clear));
    artifact
}

fn run_stages(dir: &Path) -> Manifest {
    let mut manifest = Manifest::load_or_default(dir).unwrap();

    let mut artifact = linked_artifact();
    write_artifact(dir.join(Stage::Link.file_name()), &artifact).unwrap();
    manifest.record(dir, Stage::Link).unwrap();

    prune(&mut artifact);
    write_artifact(dir.join(Stage::Prune.file_name()), &artifact).unwrap();
    manifest.record(dir, Stage::Prune).unwrap();

    let pruned = read_artifact(manifest.verify(dir, Stage::Prune).unwrap()).unwrap();
    write_compact(dir.join(Stage::Compact.file_name()), &compact(&pruned).unwrap()).unwrap();
    manifest.record(dir, Stage::Compact).unwrap();
    manifest.save(dir).unwrap();
    manifest
}

// ---------------------------------------------------------------------------
// Checkpoint flow
// ---------------------------------------------------------------------------

#[test]
fn test_full_stage_flow_records_every_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = run_stages(dir.path());

    let loaded = Manifest::load(dir.path()).unwrap();
    assert_eq!(loaded, manifest);
    for stage in Stage::ALL {
        assert!(loaded.verify(dir.path(), stage).is_ok(), "{stage} should verify");
    }

    let pruned = read_artifact(dir.path().join("pruned.json")).unwrap();
    assert!(!pruned.types.contains_key("sample.plugin.Orphan"));
    let combined = read_artifact(dir.path().join("combined.json")).unwrap();
    assert!(combined.types.contains_key("sample.plugin.Orphan"));
}

#[test]
fn test_tampered_checkpoint_blocks_resume() {
    let dir = tempfile::tempdir().unwrap();
    run_stages(dir.path());

    std::fs::write(dir.path().join("combined.json"), "{}").unwrap();
    let manifest = Manifest::load(dir.path()).unwrap();
    assert!(matches!(
        manifest.verify(dir.path(), Stage::Link),
        Err(StoreError::InvalidChecksum(_))
    ));
}

// ---------------------------------------------------------------------------
// Compaction round trip
// ---------------------------------------------------------------------------

#[test]
fn test_compact_roundtrip_reconstructs_every_path() {
    let dir = tempfile::tempdir().unwrap();
    run_stages(dir.path());

    let pruned = read_artifact(dir.path().join("pruned.json")).unwrap();
    let expanded = expand(&read_compact(dir.path().join("compact.json.gz")).unwrap()).unwrap();

    for (name, ty) in &pruned.types {
        assert_eq!(expanded["types"][name]["file"], ty.file.as_str());
        if let Some(line) = ty.line {
            assert_eq!(expanded["types"][name]["line"], line);
        }
    }
    for (i, module) in pruned.modules.iter().enumerate() {
        let entry = &expanded["modules"][i];
        let location = module.location.as_ref().unwrap();
        assert_eq!(entry["location"]["file"], location.file.as_str());
        for (j, example) in module.examples.iter().enumerate() {
            assert_eq!(entry["examples"][j]["file"], example.file.as_str());
        }
        for (j, cmd) in module.cmds.iter().enumerate() {
            if let Some(location) = &cmd.location {
                assert_eq!(entry["cmds"][j]["location"]["file"], location.file.as_str());
            }
        }
    }
    assert!(expanded["types"]["bess.pb.ACLArg"].get("dep").is_none());
}
