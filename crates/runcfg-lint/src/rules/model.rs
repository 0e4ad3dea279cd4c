//! Model section rules.

use runcfg_core::{KeyPath, Node};
use runcfg_schema::model::{FMAPI_MODEL_NAMES, MEGABLOCKS_FFN_TYPES};

use super::{describe, is_unresolved, models};
use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

/// Named process groups for the load-balancing loss.
const LBL_PROCESS_GROUPS: &[&str] = &["expert_group", "global_group"];

/// Foundation Model API wrappers know where their endpoint is.
pub struct FmapiEndpoint;

impl Rule for FmapiEndpoint {
    fn id(&self) -> &'static str {
        "fmapi-endpoint"
    }

    fn description(&self) -> &'static str {
        "fmapi_causal_lm / fmapi_chat models set local: true or base_url"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        for (path, model) in models(ctx.tree()) {
            let Some(name) = model.get("name").and_then(Node::as_str) else {
                continue;
            };
            if !FMAPI_MODEL_NAMES.contains(&name) {
                continue;
            }
            let local = model.get("local").and_then(Node::as_bool) == Some(true);
            let base_url = model.get("base_url").is_some_and(|n| !n.is_null());
            if !local && !base_url {
                out.push(
                    self.diagnostic(path, format!("{name} model has no endpoint"))
                        .with_help("set base_url, or local: true for a locally served endpoint"),
                );
            }
        }
    }
}

/// MegaBlocks mixture-of-experts layers are fully configured.
pub struct MoeConfig;

impl Rule for MoeConfig {
    fn id(&self) -> &'static str {
        "moe-config"
    }

    fn description(&self) -> &'static str {
        "MegaBlocks FFNs set moe_world_size, a valid lbl_process_group and a 1-D device_mesh"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        for (model_path, model) in models(ctx.tree()) {
            let Some(ffn) = model.get("ffn_config") else {
                continue;
            };
            let Some(ffn_type) = ffn.get("ffn_type").and_then(Node::as_str) else {
                continue;
            };
            if !MEGABLOCKS_FFN_TYPES.contains(&ffn_type) {
                continue;
            }
            let path = model_path.key("ffn_config");
            self.check_world_size(&path, ffn, ffn_type, out);
            self.check_process_group(&path, ffn, out);
            self.check_device_mesh(&path, ffn, out);
        }
    }
}

impl MoeConfig {
    fn check_world_size(&self, path: &KeyPath, ffn: &Node, ffn_type: &str, out: &mut Vec<Diagnostic>) {
        match ffn.get("moe_world_size") {
            None | Some(Node::Null) => out.push(
                self.diagnostic(
                    path.key("moe_world_size"),
                    format!("{ffn_type} requires moe_world_size"),
                )
                .with_help("set it to the number of ranks experts are sharded over; 1 for none"),
            ),
            Some(node) if is_unresolved(node) => {}
            Some(node) if node.as_i64().is_some_and(|n| n >= 1) => {}
            Some(node) => out.push(self.diagnostic(
                path.key("moe_world_size"),
                format!("moe_world_size must be a positive integer, found {}", describe(node)),
            )),
        }
    }

    fn check_process_group(&self, path: &KeyPath, ffn: &Node, out: &mut Vec<Diagnostic>) {
        let Some(group) = ffn.get("lbl_process_group") else {
            return;
        };
        let valid = match group {
            Node::String(s) => LBL_PROCESS_GROUPS.contains(&s.as_str()) || is_unresolved(group),
            Node::Int(_) | Node::Null => true,
            _ => false,
        };
        if !valid {
            out.push(
                self.diagnostic(
                    path.key("lbl_process_group"),
                    format!("invalid lbl_process_group {}", describe(group)),
                )
                .with_help("use expert_group, global_group or a group size"),
            );
        }
    }

    fn check_device_mesh(&self, path: &KeyPath, ffn: &Node, out: &mut Vec<Diagnostic>) {
        let Some(mesh) = ffn.get("device_mesh") else {
            return;
        };
        if mesh.is_null() || is_unresolved(mesh) {
            return;
        }
        match mesh.as_seq() {
            Some(dims) if dims.len() == 1 => {}
            Some(dims) => out.push(self.diagnostic(
                path.key("device_mesh"),
                format!("device_mesh must have exactly one dimension, found {}", dims.len()),
            )),
            None => out.push(self.diagnostic(
                path.key("device_mesh"),
                format!("device_mesh must be a list, found {}", describe(mesh)),
            )),
        }
    }
}
