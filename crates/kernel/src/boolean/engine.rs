use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bsp::{BspTree, CoplanarRule, clip_to_box};
use crate::config::KernelConfig;
use crate::geometry::EPSILON;
use crate::mesh::{FacetedSolid, Polygon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    Union,
    Difference,
    Intersection,
}

/// What each operand contributes to the result.
struct Recipe {
    a_rule: CoplanarRule,
    a_keeps_outside: bool,
    b_rule: CoplanarRule,
    b_keeps_outside: bool,
    flip_b: bool,
}

impl BoolOp {
    fn recipe(self) -> Recipe {
        match self {
            BoolOp::Union => Recipe {
                a_rule: CoplanarRule::SameFacingFront,
                a_keeps_outside: true,
                b_rule: CoplanarRule::AlwaysBack,
                b_keeps_outside: true,
                flip_b: false,
            },
            BoolOp::Difference => Recipe {
                a_rule: CoplanarRule::OppositeFacingFront,
                a_keeps_outside: true,
                b_rule: CoplanarRule::AlwaysFront,
                b_keeps_outside: false,
                flip_b: true,
            },
            BoolOp::Intersection => Recipe {
                a_rule: CoplanarRule::OppositeFacingFront,
                a_keeps_outside: false,
                b_rule: CoplanarRule::AlwaysFront,
                b_keeps_outside: false,
                flip_b: false,
            },
        }
    }
}

/// Combine two closed solids.
///
/// Only the operands' own polygons are clipped; tree-internal fragments never
/// reach the output, so untouched regions keep their original facets.
/// Polygons of `a` away from `b` skip classification entirely, and `b` is
/// classified against the part of `a` near it.
pub fn boolean_op(a: &FacetedSolid, b: &FacetedSolid, op: BoolOp, config: &KernelConfig) -> FacetedSolid {
    if a.is_empty() || b.is_empty() {
        return match op {
            BoolOp::Union if a.is_empty() => b.clone(),
            BoolOp::Union | BoolOp::Difference => a.clone(),
            BoolOp::Intersection => FacetedSolid::default(),
        };
    }

    let recipe = op.recipe();
    let b_box = b.bounding_box();
    let probe = b_box.expanded(EPSILON * 10.0);
    let mut result = Vec::with_capacity(a.polygons.len() + b.polygons.len());

    let b_tree = BspTree::build(b.polygons.clone());
    let mut classified_a = 0usize;
    for polygon in &a.polygons {
        if !polygon.bounding_box().intersects(&probe) {
            if recipe.a_keeps_outside {
                result.push(polygon.clone());
            }
            continue;
        }
        classified_a += 1;
        let (mut outside, mut inside) = (Vec::new(), Vec::new());
        b_tree.partition(polygon.clone(), recipe.a_rule, &mut outside, &mut inside);
        result.extend(if recipe.a_keeps_outside { outside } else { inside });
    }

    let region = b_box.expanded(config.locality_margin);
    let local: Vec<Polygon> = a
        .polygons
        .iter()
        .filter(|p| p.bounding_box().intersects(&region))
        .filter_map(|p| clip_to_box(p, &region))
        .collect();
    let local_count = local.len();
    let a_tree = if local.is_empty() {
        BspTree::build(a.polygons.clone())
    } else {
        BspTree::build(local)
    };
    for polygon in &b.polygons {
        let (mut outside, mut inside) = (Vec::new(), Vec::new());
        a_tree.partition(polygon.clone(), recipe.b_rule, &mut outside, &mut inside);
        let mut kept = if recipe.b_keeps_outside { outside } else { inside };
        if recipe.flip_b {
            for p in &mut kept {
                p.flip();
            }
        }
        result.extend(kept);
    }

    debug!(
        ?op,
        a_polygons = a.polygons.len(),
        b_polygons = b.polygons.len(),
        classified_a,
        local_a = local_count,
        result_polygons = result.len(),
        "boolean complete"
    );
    FacetedSolid::new(result)
}
