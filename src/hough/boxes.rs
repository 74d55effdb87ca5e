use super::axis::{DiscreteAxis, DiscreteRange};

/// Lower and upper parameter value per axis.
pub type ParamBounds<const N: usize> = [(f64, f64); N];

/// N-dimensional box: one index range per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HoughBox<const N: usize> {
    pub ranges: [DiscreteRange; N],
}

impl<const N: usize> HoughBox<N> {
    pub fn full(axes: &[DiscreteAxis; N]) -> Self {
        Self {
            ranges: std::array::from_fn(|i| axes[i].full_range()),
        }
    }

    pub fn bounds(&self, axes: &[DiscreteAxis; N]) -> ParamBounds<N> {
        std::array::from_fn(|i| axes[i].bounds(self.ranges[i]))
    }

    pub fn center(&self, axes: &[DiscreteAxis; N]) -> [f64; N] {
        std::array::from_fn(|i| {
            let (lo, hi) = axes[i].bounds(self.ranges[i]);
            0.5 * (lo + hi)
        })
    }

    /// Children in lexicographic order (last axis varies fastest), or `None`
    /// when no axis can be divided any more.
    pub fn children(&self, axes: &[DiscreteAxis; N], divisions: &[usize; N]) -> Option<Vec<Self>> {
        let per_axis: [Vec<DiscreteRange>; N] =
            std::array::from_fn(|i| axes[i].divide(self.ranges[i], divisions[i]));
        if per_axis.iter().all(|parts| parts.len() == 1) {
            return None;
        }

        let total: usize = per_axis.iter().map(Vec::len).product();
        let mut children = Vec::with_capacity(total);
        let mut counter = [0usize; N];
        for _ in 0..total {
            children.push(Self {
                ranges: std::array::from_fn(|i| per_axis[i][counter[i]]),
            });
            for axis in (0..N).rev() {
                counter[axis] += 1;
                if counter[axis] < per_axis[axis].len() {
                    break;
                }
                counter[axis] = 0;
            }
        }
        Some(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes() -> [DiscreteAxis; 3] {
        [
            DiscreteAxis::linspace(0.0, 1.0, 17, 1).unwrap(),
            DiscreteAxis::linspace(-1.0, 1.0, 9, 0).unwrap(),
            DiscreteAxis::linspace(0.0, 0.0, 1, 0).unwrap(),
        ]
    }

    #[test]
    fn children_cover_parent_in_lexicographic_order() {
        let axes = axes();
        let root = HoughBox::full(&axes);
        let children = root.children(&axes, &[2, 2, 2]).expect("divisible");
        assert_eq!(children.len(), 4);
        assert_eq!(children[0].ranges[0], DiscreteRange::new(0, 9));
        assert_eq!(children[0].ranges[1], DiscreteRange::new(0, 4));
        assert_eq!(children[1].ranges[0], DiscreteRange::new(0, 9));
        assert_eq!(children[1].ranges[1], DiscreteRange::new(4, 8));
        assert_eq!(children[3].ranges[0], DiscreteRange::new(7, 16));
        for axis in 0..3 {
            let lo = children.iter().map(|c| c.ranges[axis].lo).min().unwrap();
            let hi = children.iter().map(|c| c.ranges[axis].hi).max().unwrap();
            assert_eq!((lo, hi), (root.ranges[axis].lo, root.ranges[axis].hi));
        }
    }

    #[test]
    fn indivisible_box_has_no_children() {
        let axes = axes();
        let leaf = HoughBox {
            ranges: [
                DiscreteRange::new(3, 4),
                DiscreteRange::new(2, 3),
                DiscreteRange::new(0, 0),
            ],
        };
        assert!(leaf.children(&axes, &[2, 2, 2]).is_none());
    }

    #[test]
    fn center_is_midpoint() {
        let axes = axes();
        let root = HoughBox::full(&axes);
        assert_eq!(root.center(&axes), [0.5, 0.0, 0.0]);
    }
}
