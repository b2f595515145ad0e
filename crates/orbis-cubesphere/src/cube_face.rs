//! The six root faces of the cube and the basis each one is parameterised in.

use glam::DVec3;

/// Orthonormal basis of one cube face.
///
/// `tangent × bitangent == normal`, so a grid laid out along `+tangent`
/// then `+bitangent` winds counter-clockwise when seen from outside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBasis {
    /// Outward normal; also the face centre on the `[-1, 1]` cube.
    pub normal: DVec3,
    /// Direction of increasing `s` across the face.
    pub tangent: DVec3,
    /// Direction of increasing `t` across the face.
    pub bitangent: DVec3,
}

/// One face of the cube that is inflated into the planet sphere.
///
/// Each face is the top-level subdivision of the terrain and owns exactly
/// one root patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CubeFace {
    /// +X face
    PosX = 0,
    /// −X face
    NegX = 1,
    /// +Y face
    PosY = 2,
    /// −Y face
    NegY = 3,
    /// +Z face
    PosZ = 4,
    /// −Z face
    NegZ = 5,
}

const BASES: [FaceBasis; 6] = [
    FaceBasis {
        normal: DVec3::X,
        tangent: DVec3::NEG_Z,
        bitangent: DVec3::Y,
    },
    FaceBasis {
        normal: DVec3::NEG_X,
        tangent: DVec3::Z,
        bitangent: DVec3::Y,
    },
    FaceBasis {
        normal: DVec3::Y,
        tangent: DVec3::X,
        bitangent: DVec3::NEG_Z,
    },
    FaceBasis {
        normal: DVec3::NEG_Y,
        tangent: DVec3::X,
        bitangent: DVec3::Z,
    },
    FaceBasis {
        normal: DVec3::Z,
        tangent: DVec3::X,
        bitangent: DVec3::Y,
    },
    FaceBasis {
        normal: DVec3::NEG_Z,
        tangent: DVec3::NEG_X,
        bitangent: DVec3::Y,
    },
];

impl CubeFace {
    /// All six faces in root-planting order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// The basis this face is parameterised in.
    #[must_use]
    pub fn basis(self) -> FaceBasis {
        BASES[self as usize]
    }

    /// Outward-pointing unit normal.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        self.basis().normal
    }

    /// The face whose normal points the other way.
    #[must_use]
    pub fn opposite(self) -> CubeFace {
        CubeFace::ALL[(self as usize) ^ 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bases_are_right_handed() {
        for face in CubeFace::ALL {
            let b = face.basis();
            let cross = b.tangent.cross(b.bitangent);
            assert!(
                (cross - b.normal).length() < 1e-12,
                "tangent x bitangent != normal for {face:?}"
            );
        }
    }

    #[test]
    fn test_bases_are_orthonormal() {
        for face in CubeFace::ALL {
            let b = face.basis();
            for v in [b.normal, b.tangent, b.bitangent] {
                assert!((v.length() - 1.0).abs() < 1e-12, "{face:?} basis not unit");
            }
            assert!(b.normal.dot(b.tangent).abs() < 1e-12);
            assert!(b.normal.dot(b.bitangent).abs() < 1e-12);
            assert!(b.tangent.dot(b.bitangent).abs() < 1e-12);
        }
    }

    #[test]
    fn test_opposite_is_an_involution() {
        for face in CubeFace::ALL {
            assert_ne!(face, face.opposite());
            assert_eq!(face, face.opposite().opposite());
            assert!((face.normal() + face.opposite().normal()).length() < 1e-12);
        }
    }

    #[test]
    fn test_normals_cover_all_axes() {
        let sum: DVec3 = CubeFace::ALL.iter().map(|f| f.normal().abs()).sum();
        assert_eq!(sum, DVec3::splat(2.0));
    }
}
