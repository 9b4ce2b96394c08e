//! Text preview of a created plan.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::Result;
use crate::planner::{Plan, TreeNode};
use crate::results::ConstructNode;

use super::service::{AppPlan, ComponentRecord};

struct Listing<'a> {
    record: &'a ComponentRecord,
    children: Vec<ConstructNode>,
}

impl AppPlan {
    /// Renders the plan as a tree: child plans with their components, the
    /// root plan's components, and the constructs each component declared,
    /// followed by a summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the synthesis worker stopped.
    pub async fn preview(&self) -> Result<String> {
        let mut listings = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let children = self.synth.children(&record.node).await?;
            listings.push(Listing { record, children });
        }

        let plan = &self.plan;
        let mut root = TreeNode::new(format!("{}.{}", plan.name(), plan.namespace()));
        let mut seen = HashSet::from([plan.name()]);
        add_child_plans(plan, &mut root, &listings, &mut seen);
        add_components(plan.name(), &mut root, &listings);

        let nested: usize = listings.iter().map(|l| l.children.len()).sum();
        let mut out = root.to_string();
        let _ = writeln!(out, "\nSummary:");
        let _ = writeln!(out, "- Root Plan: {}.{}", plan.name(), plan.namespace());
        let _ = writeln!(out, "- Root Components: {}", plan.components().len());
        let _ = writeln!(out, "- All Nested Components: {nested}");
        Ok(out)
    }
}

fn add_child_plans<'a>(
    plan: &'a Plan,
    node: &mut TreeNode,
    listings: &[Listing<'_>],
    seen: &mut HashSet<&'a str>,
) {
    for child in plan.child_plans() {
        if !seen.insert(child.name()) {
            continue;
        }
        let branch = node.add(TreeNode::new(format!(
            "Plan: {}.{}",
            child.name(),
            child.namespace()
        )));
        add_child_plans(child, branch, listings, seen);
        add_components(child.name(), branch, listings);
    }
}

fn add_components(plan: &str, node: &mut TreeNode, listings: &[Listing<'_>]) {
    for listing in listings.iter().filter(|l| l.record.plan == plan) {
        let branch = node.add(TreeNode::new(format!(
            "{} ({})",
            listing.record.node.id(),
            listing.record.component
        )));
        for child in &listing.children {
            branch.add(TreeNode::new(child.id()));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SdkConfig;
    use crate::context::Context;
    use crate::error::Result;
    use crate::identity::resource_id;
    use crate::manifest::{Action, ClientSideApply, ClientSideApplyManifest};
    use crate::orchestrator::PlanService;
    use crate::planner::Plan;
    use crate::results::Unit;

    async fn services(ctx: Context) -> Result<Unit> {
        let chart = ctx.chart(&resource_id("services", &2)).await?;
        for name in ["api", "web"] {
            chart
                .add_resource(name, &serde_json::json!({"kind": "Service", "metadata": {"name": name}}))
                .await?;
        }
        Ok(chart.into_unit())
    }

    #[tokio::test]
    async fn test_preview_lists_plans_components_and_summary() {
        let plan = Plan::new("app")
            .with_namespace("prod")
            .with_component(services)
            .with_child(|| {
                Plan::new("setup").with_component(ClientSideApply::new(
                    ClientSideApplyManifest::new(Action::Cmd, ["true"]),
                ))
            });
        let app = PlanService::new(SdkConfig::default().with_dry_run(true))
            .create_plan(&Context::new(), plan)
            .await
            .unwrap();

        let preview = app.preview().await.unwrap();
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(lines[0], "app.prod");
        assert!(lines[1].ends_with("Plan: setup.default"));
        assert!(lines[2].contains("sdk.ClientSideApply-"));
        assert!(lines[2].ends_with("(ClientSideApply(cmd))"));
        assert!(lines[3].ends_with("cmd"));
        assert!(lines[4].contains("services-"));
        assert!(lines[5].ends_with("api"));
        assert!(lines[6].ends_with("web"));
        assert!(preview.ends_with(
            "\nSummary:\n- Root Plan: app.prod\n- Root Components: 1\n- All Nested Components: 3\n"
        ));
    }
}
