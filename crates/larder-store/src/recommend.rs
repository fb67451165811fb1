//! Recommendation ranking over traversal paths.
//!
//! Each path runs `[origin, recipe, selects, person]`: one other user who
//! selected a recipe linked to the origin more than once. Recipes are
//! deduplicated by key and annotated with how many paths reached them.

use std::collections::HashMap;

use larder_core::{Path, PropertyValue, RecommendedRecipe, VertexLabel};

/// Collapse recommendation paths into at most `limit` distinct recipes.
///
/// A recipe enters the result the first time it is seen, while fewer than
/// `limit` recipes have been admitted. Later paths to an admitted recipe
/// always increment its `recommended_user_count`, including after the
/// limit is reached; only new recipes are capped. Output keeps first-seen
/// order.
///
/// A path without a recipe vertex, or whose recipe has no `name`, is
/// skipped and logged.
pub fn rank_recommendations(paths: &[Path], limit: usize) -> Vec<RecommendedRecipe> {
    let mut ranked: Vec<RecommendedRecipe> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (index, path) in paths.iter().enumerate() {
        let Some(recipe) = path.find_vertex(VertexLabel::Recipe) else {
            tracing::warn!(index, elements = path.objects.len(), "Skipping path without recipe vertex");
            continue;
        };
        let Some(key) = recipe.name() else {
            tracing::warn!(index, id = %recipe.id, "Skipping path whose recipe has no name");
            continue;
        };

        if let Some(&position) = positions.get(key) {
            ranked[position].recommended_user_count += 1;
            continue;
        }
        if ranked.len() >= limit {
            continue;
        }

        positions.insert(key.to_string(), ranked.len());
        ranked.push(RecommendedRecipe {
            id: key.to_string(),
            title: recipe
                .property("title")
                .and_then(PropertyValue::as_str)
                .unwrap_or_default()
                .to_string(),
            recommended_user_count: 1,
        });
    }

    tracing::debug!(paths = paths.len(), recipes = ranked.len(), limit, "Ranked recommendations");
    ranked
}
