use nalgebra::Point3;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Empty box; extending it with any point makes it valid.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point3<f64>]) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.add_point(p);
        }
        bb
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    #[inline]
    pub fn add_point(&mut self, p: &Point3<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn add_box(&mut self, other: &BoundingBox) {
        if other.is_valid() {
            self.add_point(&other.min);
            self.add_point(&other.max);
        }
    }

    #[inline]
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    #[inline]
    pub fn extent(&self) -> nalgebra::Vector3<f64> {
        self.max - self.min
    }

    /// Half the diagonal length, used for sweep-box sizing.
    #[inline]
    pub fn radius(&self) -> f64 {
        0.5 * (self.max - self.min).norm()
    }

    /// Grow the box by `amount` in every direction.
    pub fn expand(&mut self, amount: f64) {
        self.min.x -= amount;
        self.min.y -= amount;
        self.min.z -= amount;
        self.max.x += amount;
        self.max.y += amount;
        self.max.z += amount;
    }
}

enum Node {
    Leaf {
        bb: BoundingBox,
        item: usize,
    },
    Internal {
        bb: BoundingBox,
        left: usize,
        right: usize,
    },
}

impl Node {
    fn bb(&self) -> &BoundingBox {
        match self {
            Node::Leaf { bb, .. } => bb,
            Node::Internal { bb, .. } => bb,
        }
    }
}

/// Static AABB tree over per-item bounding boxes.
///
/// Built once by median split along the widest axis; queries are read-only
/// and safe to run concurrently afterwards.
pub struct BoundingBoxTree {
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl BoundingBoxTree {
    /// Build from `(box, item_id)` pairs. Invalid boxes are skipped.
    pub fn build(items: &[(BoundingBox, usize)]) -> Self {
        let mut entries: Vec<(BoundingBox, usize)> = items
            .iter()
            .filter(|(bb, _)| bb.is_valid())
            .cloned()
            .collect();
        let mut tree = Self {
            nodes: Vec::with_capacity(entries.len().saturating_mul(2)),
            root: None,
        };
        if !entries.is_empty() {
            let n = entries.len();
            let root = tree.build_recursive(&mut entries, 0, n);
            tree.root = Some(root);
        }
        tree
    }

    fn build_recursive(&mut self, entries: &mut [(BoundingBox, usize)], lo: usize, hi: usize) -> usize {
        debug_assert!(lo < hi);
        if hi - lo == 1 {
            let (bb, item) = entries[lo];
            self.nodes.push(Node::Leaf { bb, item });
            return self.nodes.len() - 1;
        }

        let mut bb = BoundingBox::empty();
        for (item_bb, _) in &entries[lo..hi] {
            bb.add_box(item_bb);
        }
        let ext = bb.extent();
        let axis = if ext.x >= ext.y && ext.x >= ext.z {
            0
        } else if ext.y >= ext.z {
            1
        } else {
            2
        };

        let mid = lo + (hi - lo) / 2;
        entries[lo..hi].select_nth_unstable_by(mid - lo, |a, b| {
            let ca = a.0.center()[axis];
            let cb = b.0.center()[axis];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let left = self.build_recursive(entries, lo, mid);
        let right = self.build_recursive(entries, mid, hi);
        self.nodes.push(Node::Internal { bb, left, right });
        self.nodes.len() - 1
    }

    /// Append the ids of all items whose box intersects `query`.
    pub fn find_intersections(&self, query: &BoundingBox, out: &mut Vec<usize>) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if !node.bb().intersects(query) {
                continue;
            }
            match node {
                Node::Leaf { item, .. } => out.push(*item),
                Node::Internal { left, right, .. } => {
                    stack.push(*left);
                    stack.push(*right);
                }
            }
        }
    }
}
