//! Integration tests for canvas export and import.
//!
//! Tests JSON round-trips through a registry, the wire format of exported
//! nodes and rejection of inconsistent imports.

mod common;

use canvas_kernel::{Canvas, CanvasData, CanvasError, ContentBlock, Message, NodeId, Role};
use common::{branching_conversation, IntegrationTestContext};
use serde_json::json;

#[test]
fn exported_file_reimports_into_registry() -> anyhow::Result<()> {
    let ctx = IntegrationTestContext::new();
    let canvas = ctx.registry.create(Some("Export".into()), None);
    let convo = branching_conversation(&canvas)?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("canvas.json");
    std::fs::write(&path, canvas.to_json()?)?;

    ctx.registry.remove(canvas.id());
    let data: CanvasData = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    let restored = ctx.registry.import(data)?;

    assert_eq!(restored.id(), canvas.id());
    assert_eq!(restored.nodes(), canvas.nodes());
    assert_eq!(restored.current_branch(), "main");
    let head = restored
        .get_head_node(Some("main"))?
        .ok_or_else(|| anyhow::anyhow!("main lost its head"))?;
    assert_eq!(head.id, convo.merge.id);
    assert_eq!(ctx.registry.len(), 1);

    // The restored canvas publishes on the registry dispatcher.
    let before = ctx.events().len();
    restored.commit_message("main", Message::user("after import"), None)?;
    assert_eq!(ctx.events().len(), before + 1);
    Ok(())
}

#[test]
fn export_uses_plain_wire_names() -> anyhow::Result<()> {
    let canvas = Canvas::builder().id("fixed").title("Wire").build();
    let convo = branching_conversation(&canvas)?;
    let value = serde_json::to_value(canvas.to_canvas_data())?;

    assert_eq!(value["canvas_id"], "fixed");
    assert_eq!(value["active_branch"], "main");
    assert_eq!(value["root_ids"], json!([convo.question.id.as_str()]));

    let merge = &value["nodes"][convo.merge.id.as_str()];
    assert_eq!(merge["message"]["role"], "system");
    assert_eq!(merge["message"]["content"], "Merged both answers");
    assert_eq!(merge["parent_id"], convo.answer.id.as_str());
    assert!(merge["meta"]["timestamp"].is_string());

    let alternative = &value["nodes"][convo.alternative.id.as_str()];
    assert_eq!(alternative["child_ids"], json!([convo.merge.id.as_str()]));
    Ok(())
}

#[test]
fn tool_blocks_survive_round_trip() -> anyhow::Result<()> {
    let canvas = Canvas::new(None, None, None);
    let blocks = vec![
        ContentBlock::text("Looking it up."),
        ContentBlock::from_value(json!({
            "type": "tool_use", "id": "t1", "name": "search", "input": {"q": "dag"}
        })),
        ContentBlock::from_value(json!({
            "type": "image", "source": {"kind": "url", "url": "https://example.invalid/x.png"}
        })),
    ];
    let node = canvas.commit_message("main", Message::new(Role::Assistant, blocks), None)?;

    let restored = Canvas::from_json(&canvas.to_json()?)?;
    let copy = restored
        .get_node(&node.id)
        .ok_or_else(|| anyhow::anyhow!("node lost"))?;
    assert_eq!(copy.message, node.message);
    assert_eq!(
        serde_json::to_value(&copy.message)?,
        serde_json::to_value(&node.message)?
    );
    Ok(())
}

#[test]
fn inconsistent_imports_are_rejected() -> anyhow::Result<()> {
    let canvas = Canvas::new(None, None, None);
    let convo = branching_conversation(&canvas)?;

    let mut orphan = canvas.to_canvas_data();
    if let Some(node) = orphan.nodes.get_mut(&convo.answer.id) {
        node.parent_id = Some(NodeId::from("ghost"));
    }
    assert!(matches!(
        Canvas::from_canvas_data(orphan),
        Err(CanvasError::InvalidArgument(_))
    ));

    let mut missing_root = canvas.to_canvas_data();
    missing_root.root_ids.push(NodeId::from("ghost"));
    assert!(matches!(
        Canvas::from_canvas_data(missing_root),
        Err(CanvasError::InvalidArgument(_))
    ));

    let mut loop_data = canvas.to_canvas_data();
    let q = convo.question.id.clone();
    let a = convo.answer.id.clone();
    if let Some(node) = loop_data.nodes.get_mut(&q) {
        node.parent_id = Some(a.clone());
    }
    if let Some(node) = loop_data.nodes.get_mut(&a) {
        node.child_ids.push(q.clone());
    }
    loop_data.root_ids.clear();
    assert!(matches!(
        Canvas::from_canvas_data(loop_data),
        Err(CanvasError::InvalidArgument(_))
    ));
    Ok(())
}
