use strata_geom::Vec3;

/// Side of a voxel. Grid X grows right, grid Y grows toward the back and
/// Z grows with the layer index.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    Front = 0,
    Back = 1,
    Left = 2,
    Right = 3,
    Top = 4,
    Bottom = 5,
}

/// Grid axis a run grows along.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunAxis {
    X,
    Y,
}

impl Orientation {
    pub const ALL: [Orientation; 6] = [
        Orientation::Front,
        Orientation::Back,
        Orientation::Left,
        Orientation::Right,
        Orientation::Top,
        Orientation::Bottom,
    ];

    /// Returns the `[0..6)` index of this orientation.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(i: usize) -> Option<Orientation> {
        Self::ALL.get(i).copied()
    }

    #[inline]
    pub fn bit(self) -> u8 {
        1 << self.index()
    }

    /// Outward unit normal.
    #[inline]
    pub fn normal(self) -> Vec3 {
        let (dx, dy, dz) = self.delta();
        Vec3::new(dx as f32, dy as f32, dz as f32)
    }

    /// Grid step `(dx, dy, dlayer)` to the neighbor this face looks at.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Orientation::Front => (0, -1, 0),
            Orientation::Back => (0, 1, 0),
            Orientation::Left => (-1, 0, 0),
            Orientation::Right => (1, 0, 0),
            Orientation::Top => (0, 0, 1),
            Orientation::Bottom => (0, 0, -1),
        }
    }

    /// Front/Back/Left/Right. Lateral faces stack across layers.
    #[inline]
    pub fn is_lateral(self) -> bool {
        !matches!(self, Orientation::Top | Orientation::Bottom)
    }

    #[inline]
    pub fn run_axis(self) -> RunAxis {
        match self {
            Orientation::Left | Orientation::Right => RunAxis::Y,
            _ => RunAxis::X,
        }
    }
}

/// Set of exposed orientations of one voxel.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct FaceSet(u8);

impl FaceSet {
    pub const EMPTY: FaceSet = FaceSet(0);
    pub const ALL: FaceSet = FaceSet(0b11_1111);

    #[inline]
    pub fn insert(&mut self, o: Orientation) {
        self.0 |= o.bit();
    }

    #[inline]
    pub fn contains(self, o: Orientation) -> bool {
        self.0 & o.bit() != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Orientation> {
        Orientation::ALL.into_iter().filter(move |o| self.contains(*o))
    }
}

impl FromIterator<Orientation> for FaceSet {
    fn from_iter<I: IntoIterator<Item = Orientation>>(iter: I) -> Self {
        let mut set = FaceSet::EMPTY;
        for o in iter {
            set.insert(o);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normals_are_unit_and_opposed() {
        let pairs = [
            (Orientation::Front, Orientation::Back),
            (Orientation::Left, Orientation::Right),
            (Orientation::Top, Orientation::Bottom),
        ];
        for (a, b) in pairs {
            assert_eq!(a.normal().length(), 1.0);
            assert_eq!(a.normal() + b.normal(), Vec3::ZERO);
        }
        assert_eq!(Orientation::Front.normal(), Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(Orientation::Top.normal(), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn index_roundtrip() {
        for o in Orientation::ALL {
            assert_eq!(Orientation::from_index(o.index()), Some(o));
        }
        assert_eq!(Orientation::from_index(6), None);
    }

    #[test]
    fn face_set_ops() {
        let mut s = FaceSet::EMPTY;
        assert!(s.is_empty());
        s.insert(Orientation::Left);
        s.insert(Orientation::Top);
        s.insert(Orientation::Left);
        assert_eq!(s.len(), 2);
        assert_eq!(
            s.iter().collect::<Vec<_>>(),
            vec![Orientation::Left, Orientation::Top]
        );
        assert_eq!(FaceSet::ALL.len(), 6);
        assert_eq!(Orientation::ALL.into_iter().collect::<FaceSet>(), FaceSet::ALL);
    }
}
