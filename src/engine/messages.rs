use crate::query::plan::QueryPlan;

/// Typed commands the UI sends into the engine's inbox (§5). The engine
/// processes these in arrival order, but search itself is latest-wins.
#[derive(Debug)]
pub enum EngineCommand {
    Init { manifest_path: String },
    Search { plan: QueryPlan, request_id: Option<u64> },
}

/// Typed messages the engine emits back across the message boundary (§5,
/// §7 — no exception types cross this boundary, only these variants).
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A non-fatal status line, or a fatal init/query failure reported as
    /// `"加载失败: <reason>"` (§5 timeouts, §7 propagation).
    Progress { stage: String },
    Ready,
    Results { request_id: Option<u64>, doc_ids: Vec<u32>, total: usize, has_more: bool },
}
