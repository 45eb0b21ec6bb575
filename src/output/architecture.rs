//! `ARCHITECTURE.md` with a mermaid graph of the generated stack

use crate::stack::{Category, ComponentId};

fn node_id(id: &ComponentId) -> String {
    id.name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        + "_"
        + id.category.name()
}

/// Renders components in generation order and the resolved
/// `dependency --> dependent` edges.
pub fn render(
    project_name: &str,
    components: &[ComponentId],
    edges: &[(ComponentId, ComponentId)],
) -> String {
    let mut graph = String::from("graph TD\n");
    for category in Category::all_variants() {
        let members: Vec<&ComponentId> =
            components.iter().filter(|c| c.category == *category).collect();
        if members.is_empty() {
            continue;
        }
        graph.push_str(&format!("    subgraph {}\n", category));
        for id in members {
            graph.push_str(&format!("        {}[\"{}\"]\n", node_id(id), id.name));
        }
        graph.push_str("    end\n");
    }
    for (from, to) in edges {
        graph.push_str(&format!("    {} --> {}\n", node_id(from), node_id(to)));
    }

    let mut doc = format!(
        "# {} architecture\n\n```mermaid\n{}```\n\n## Components\n\n| Order | Category | Provider |\n|---|---|---|\n",
        project_name, graph
    );
    for (i, id) in components.iter().enumerate() {
        doc.push_str(&format!("| {} | {} | {} |\n", i + 1, id.category, id.name));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_nodes_and_edges() {
        let pg = ComponentId::new(Category::Storage, "PostgreSQL");
        let ge = ComponentId::new(Category::Quality, "Great Expectations");
        let doc = render("acme", &[pg.clone(), ge.clone()], &[(pg, ge)]);

        assert!(doc.starts_with("# acme architecture\n"));
        assert!(doc.contains("```mermaid\ngraph TD\n"));
        assert!(doc.contains("subgraph storage"));
        assert!(doc.contains("Great_Expectations_quality[\"Great Expectations\"]"));
        assert!(doc.contains("PostgreSQL_storage --> Great_Expectations_quality"));
        assert!(doc.contains("| 2 | quality | Great Expectations |"));
    }
}
