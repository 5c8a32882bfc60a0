//! Plain-text layout files.
//!
//! ```text
//! root vertical 0.5
//! left_leaf
//! right_root horizontal 0.5
//! left_leaf
//! right_leaf
//! ```
//!
//! Only the shape, axes and ratios are stored. Restored leaves are empty
//! placeholders that get filled as windows are tiled in.

use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::layout_engine::Split;
use crate::layout_engine::binary_tree::{BspTree, Shape};
use crate::layout_engine::region::Region;

#[derive(Debug, thiserror::Error)]
pub enum LayoutFileError {
    #[error("layout has no splits to save")]
    NothingToSave,
    #[error("layout file is empty")]
    Empty,
    #[error("line {line}: expected {expected}, found `{found}`")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },
    #[error("line {line}: invalid split `{token}`")]
    InvalidSplit { line: usize, token: String },
    #[error("line {line}: invalid ratio `{token}`")]
    InvalidRatio { line: usize, token: String },
    #[error("unexpected end of layout after line {line}")]
    UnexpectedEnd { line: usize },
    #[error("line {line}: trailing input after complete layout")]
    TrailingInput { line: usize },
    #[error("line {line}: layout nests deeper than {max} splits")]
    TooDeep { line: usize, max: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BspTree {
    /// Serializes the shape of the tree. A tree without splits has nothing
    /// worth persisting and is rejected.
    pub fn serialize(&self) -> Result<String, LayoutFileError> {
        let Some(shape @ Shape::Split { .. }) = self.shape() else {
            return Err(LayoutFileError::NothingToSave);
        };
        let mut out = String::new();
        write_shape(&mut out, "root", &shape);
        Ok(out)
    }

    pub fn deserialize(
        text: &str,
        bounds: Region,
        gap: f64,
        optimal_ratio: f64,
    ) -> Result<BspTree, LayoutFileError> {
        let shape = parse(text)?;
        Ok(BspTree::from_shape(&shape, bounds, gap, optimal_ratio))
    }
}

fn write_shape(out: &mut String, tag: &str, shape: &Shape) {
    match shape {
        Shape::Leaf => {
            out.push_str(tag);
            out.push_str("_leaf\n");
        }
        Shape::Split { split, ratio, first, second } => {
            let tag = if tag == "root" { "root".to_string() } else { format!("{tag}_root") };
            out.push_str(&format!("{tag} {split} {ratio}\n"));
            write_shape(out, "left", first);
            write_shape(out, "right", second);
        }
    }
}

/// Nesting limit for layout files. Parsing, building and dropping a shape
/// all recurse once per level.
pub const MAX_DEPTH: usize = 128;

struct Parser<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    line: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn next_tokens(&mut self) -> Result<(usize, Vec<&'a str>), LayoutFileError> {
        loop {
            let Some((idx, raw)) = self.lines.next() else {
                return Err(LayoutFileError::UnexpectedEnd { line: self.line });
            };
            self.line = idx + 1;
            let tokens: Vec<&str> = raw.split_whitespace().collect();
            if !tokens.is_empty() {
                return Ok((self.line, tokens));
            }
        }
    }

    fn split_node(&mut self, line: usize, tokens: &[&str]) -> Result<Shape, LayoutFileError> {
        let [_, split, ratio] = tokens else {
            return Err(LayoutFileError::UnexpectedToken {
                line,
                expected: "<split> <ratio>",
                found: tokens.join(" "),
            });
        };
        let split = Split::from_str(split).map_err(|_| LayoutFileError::InvalidSplit {
            line,
            token: split.to_string(),
        })?;
        let ratio = f64::from_str(ratio)
            .ok()
            .filter(|r| *r > 0.0 && *r < 1.0)
            .ok_or_else(|| LayoutFileError::InvalidRatio { line, token: ratio.to_string() })?;
        if self.depth == MAX_DEPTH {
            return Err(LayoutFileError::TooDeep { line, max: MAX_DEPTH });
        }
        self.depth += 1;
        let first = self.child("left")?;
        let second = self.child("right")?;
        self.depth -= 1;
        Ok(Shape::Split {
            split,
            ratio,
            first: Box::new(first),
            second: Box::new(second),
        })
    }

    fn child(&mut self, side: &'static str) -> Result<Shape, LayoutFileError> {
        let (line, tokens) = self.next_tokens()?;
        let head = tokens[0];
        match head.strip_prefix(side) {
            Some("_leaf") if tokens.len() == 1 => Ok(Shape::Leaf),
            Some("_root") => self.split_node(line, &tokens),
            _ => Err(LayoutFileError::UnexpectedToken {
                line,
                expected: if side == "left" { "left_root or left_leaf" } else { "right_root or right_leaf" },
                found: tokens.join(" "),
            }),
        }
    }
}

fn parse(text: &str) -> Result<Shape, LayoutFileError> {
    let mut parser = Parser { lines: text.lines().enumerate(), line: 0, depth: 0 };
    let (line, tokens) = parser.next_tokens().map_err(|_| LayoutFileError::Empty)?;
    if tokens[0] != "root" {
        return Err(LayoutFileError::UnexpectedToken {
            line,
            expected: "root",
            found: tokens.join(" "),
        });
    }
    let shape = parser.split_node(line, &tokens)?;
    for (idx, raw) in parser.lines {
        if !raw.trim().is_empty() {
            return Err(LayoutFileError::TrailingInput { line: idx + 1 });
        }
    }
    Ok(shape)
}

pub fn save_layout(tree: &BspTree, path: &Path) -> Result<(), LayoutFileError> {
    let text = tree.serialize()?;
    std::fs::write(path, text)?;
    debug!(path = %path.display(), "saved layout");
    Ok(())
}

pub fn load_layout(
    path: &Path,
    bounds: Region,
    gap: f64,
    optimal_ratio: f64,
) -> Result<BspTree, LayoutFileError> {
    let text = std::fs::read_to_string(path)?;
    let tree = BspTree::deserialize(&text, bounds, gap, optimal_ratio)?;
    debug!(path = %path.display(), leaves = tree.leaves().len(), "loaded layout");
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::DEFAULT_OPTIMAL_RATIO;
    use crate::layout_engine::binary_tree::SplitSettings;
    use crate::sys::geometry::Rect;
    use crate::sys::window_server::WindowId;

    fn bounds() -> Region { Region::full(Rect::from_xywh(0., 0., 1920., 1080.)) }

    fn sample_tree() -> BspTree {
        let mut tree = BspTree::new(bounds(), 0.);
        let settings = SplitSettings::default();
        tree.tile_in(WindowId(1), None, &settings);
        let b = tree.tile_in(WindowId(2), None, &settings).unwrap();
        tree.tile_in(WindowId(3), Some(b), &settings);
        let root = tree.root().unwrap();
        tree.set_ratio(root, 0.6180339887);
        tree
    }

    #[test]
    fn serializes_pre_order() {
        let text = sample_tree().serialize().unwrap();
        assert_eq!(
            text,
            "root vertical 0.6180339887\nleft_leaf\nright_root horizontal 0.5\nleft_leaf\nright_leaf\n"
        );
    }

    #[test]
    fn round_trip_preserves_shape_axes_and_ratios() {
        let mut tree = sample_tree();
        let inner = tree.children(tree.root().unwrap()).unwrap().1;
        tree.set_ratio(inner, 0.1 + 0.2);
        let text = tree.serialize().unwrap();
        let restored = BspTree::deserialize(&text, bounds(), 0., DEFAULT_OPTIMAL_RATIO).unwrap();
        assert_eq!(restored.shape(), tree.shape());
        assert_eq!(restored.windows(), vec![]);
        assert_eq!(restored.leaves().len(), 3);
        restored.assert_invariants();
    }

    #[test]
    fn restored_placeholders_fill_in_order() {
        let text = sample_tree().serialize().unwrap();
        let mut restored =
            BspTree::deserialize(&text, bounds(), 0., DEFAULT_OPTIMAL_RATIO).unwrap();
        let settings = SplitSettings::default();
        for id in [7, 8, 9, 10] {
            restored.tile_in(WindowId(id), None, &settings);
        }
        let windows = restored.windows();
        assert_eq!(windows.len(), 4);
        // The first three take the placeholders; the fourth splits a leaf.
        let first_three: Vec<_> = restored
            .leaves()
            .into_iter()
            .filter_map(|l| restored.window(l))
            .filter(|w| w.0 != 10)
            .collect();
        assert_eq!(first_three, vec![WindowId(7), WindowId(8), WindowId(9)]);
        restored.assert_invariants();
    }

    #[test]
    fn single_leaf_has_nothing_to_save() {
        let mut tree = BspTree::new(bounds(), 0.);
        assert!(matches!(tree.serialize(), Err(LayoutFileError::NothingToSave)));
        tree.tile_in(WindowId(1), None, &SplitSettings::default());
        assert!(matches!(tree.serialize(), Err(LayoutFileError::NothingToSave)));
    }

    #[test]
    fn rejects_malformed_files() {
        let cases = [
            ("", "empty"),
            ("left_leaf\n", "root"),
            ("root diagonal 0.5\nleft_leaf\nright_leaf\n", "split"),
            ("root vertical 1.5\nleft_leaf\nright_leaf\n", "ratio"),
            ("root vertical 0.5\nleft_leaf\n", "end"),
            ("root vertical 0.5\nright_leaf\nleft_leaf\n", "order"),
            ("root vertical 0.5\nleft_leaf\nright_leaf\nright_leaf\n", "trailing"),
        ];
        for (text, what) in cases {
            let parsed = BspTree::deserialize(text, bounds(), 0., DEFAULT_OPTIMAL_RATIO);
            assert!(parsed.is_err(), "accepted {what}");
        }
    }

    #[test]
    fn rejects_layouts_nested_too_deep() {
        let levels = MAX_DEPTH * 40;
        let mut text = String::from("root vertical 0.5\n");
        for _ in 1..levels {
            text.push_str("left_root vertical 0.5\n");
        }
        for _ in 0..levels {
            text.push_str("right_leaf\n");
        }
        let err = BspTree::deserialize(&text, bounds(), 0., DEFAULT_OPTIMAL_RATIO).unwrap_err();
        assert!(matches!(err, LayoutFileError::TooDeep { line, max: MAX_DEPTH } if line == MAX_DEPTH + 1));
    }

    #[test]
    fn nesting_up_to_the_limit_is_accepted() {
        let mut text = String::from("root vertical 0.5\n");
        for _ in 1..MAX_DEPTH {
            text.push_str("left_root horizontal 0.5\n");
        }
        text.push_str("left_leaf\n");
        for _ in 0..MAX_DEPTH {
            text.push_str("right_leaf\n");
        }
        let tree = BspTree::deserialize(&text, bounds(), 0., DEFAULT_OPTIMAL_RATIO).unwrap();
        assert_eq!(tree.leaves().len(), MAX_DEPTH + 1);
        tree.assert_invariants();
    }

    #[test]
    fn optimal_splits_use_configured_threshold() {
        let text = "root optimal 0.5\nleft_leaf\nright_leaf\n";
        let narrow = Region::full(Rect::from_xywh(0., 0., 1280., 1080.));
        let tree = BspTree::deserialize(text, narrow, 0., 1.0).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.get(root).unwrap().split(), Some(Split::Vertical));

        let tree = BspTree::deserialize(text, narrow, 0., DEFAULT_OPTIMAL_RATIO).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.get(root).unwrap().split(), Some(Split::Horizontal));
    }

    #[test]
    fn ignores_blank_lines() {
        let text = "root horizontal 0.25\n\nleft_leaf\nright_leaf\n\n";
        let tree = BspTree::deserialize(text, bounds(), 0., DEFAULT_OPTIMAL_RATIO).unwrap();
        let (upper, _) = tree.children(tree.root().unwrap()).unwrap();
        assert_eq!(tree.region(upper).unwrap().rect, Rect::from_xywh(0., 0., 1920., 270.));
    }

    #[test]
    fn save_and_load_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.bsp");
        let tree = sample_tree();
        save_layout(&tree, &path).unwrap();
        let restored = load_layout(&path, bounds(), 0., DEFAULT_OPTIMAL_RATIO).unwrap();
        assert_eq!(restored.shape(), tree.shape());
        assert!(matches!(
            load_layout(&dir.path().join("missing"), bounds(), 0., DEFAULT_OPTIMAL_RATIO),
            Err(LayoutFileError::Io(_))
        ));
    }
}
