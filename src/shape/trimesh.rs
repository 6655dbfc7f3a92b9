use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Point, Real, TexCoord, Transform, Vector};
use crate::partitioning::{Bvh, BvhBuildParams};
use crate::shape::{PrimitiveSet, Triangle};
use alloc::vec::Vec;
use std::sync::OnceLock;

/// Error indicating that a triangle mesh can’t be built from the given buffers.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TriMeshBuilderError {
    /// A triangle references a vertex that doesn’t exist.
    #[error("the triangle {triangle} references the vertex {vertex} but the mesh only has {num_vertices} vertices.")]
    IndexOutOfBounds {
        /// The index of the faulty triangle.
        triangle: usize,
        /// The out-of-bounds vertex index.
        vertex: u32,
        /// The number of vertices of the mesh.
        num_vertices: usize,
    },
    /// A per-vertex attribute buffer doesn’t have one element per vertex.
    #[error("the {attribute} buffer has {len} elements but the mesh has {num_vertices} vertices.")]
    AttributeLengthMismatch {
        /// The name of the attribute (`"normals"` or `"uvs"`).
        attribute: &'static str,
        /// The length of the attribute buffer.
        len: usize,
        /// The number of vertices of the mesh.
        num_vertices: usize,
    },
}

/// The BVH over the triangles of a [`TriMesh`].
///
/// It is a pure function of the mesh vertex and index buffers, tagged with the
/// [generation](TriMesh::generation) of the vertex buffer it was built from.
#[derive(Clone, Debug)]
pub struct MeshBvh {
    bvh: Bvh,
    skipped: usize,
    generation: u64,
}

impl MeshBvh {
    /// Builds the BVH over the triangles of `mesh`.
    ///
    /// This only reads the mesh, so it can run on any thread. Install the result with
    /// [`TriMesh::install_bvh`].
    pub fn build(mesh: &TriMesh, params: &BvhBuildParams) -> Self {
        let primitives = PrimitiveSet::from_triangles(&mesh.vertices, &mesh.indices);
        Self {
            bvh: Bvh::from_primitive_set(&primitives, params),
            skipped: primitives.skipped_count(),
            generation: mesh.generation,
        }
    }

    /// The BVH whose primitive ids are triangle indices.
    #[inline]
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// The number of degenerate triangles left out of the BVH.
    #[inline]
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    /// The generation of the vertex buffer this BVH was built from.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// An indexed triangle mesh, with optional per-vertex normals and texture coordinates.
///
/// The BVH over its triangles is built lazily, on the first ray cast reaching the mesh, and
/// cached until the vertex positions change through [`TriMesh::set_vertices`]. It can also be
/// built ahead of time (e.g. on a worker thread) with [`MeshBvh::build`] and
/// [`TriMesh::install_bvh`].
#[derive(Clone, Debug)]
pub struct TriMesh {
    vertices: Vec<Point<Real>>,
    indices: Vec<[u32; 3]>,
    normals: Option<Vec<Vector<Real>>>,
    uvs: Option<Vec<TexCoord<Real>>>,
    local_aabb: Aabb,
    build_params: BvhBuildParams,
    generation: u64,
    bvh: OnceLock<MeshBvh>,
}

impl TriMesh {
    /// Creates a new triangle mesh from a vertex buffer and an index buffer.
    ///
    /// An empty index buffer is allowed: the mesh then can’t be hit by anything.
    pub fn new(
        vertices: Vec<Point<Real>>,
        indices: Vec<[u32; 3]>,
    ) -> Result<Self, TriMeshBuilderError> {
        check_indices(&indices, vertices.len())?;

        Ok(Self {
            local_aabb: triangles_aabb(&vertices, &indices),
            vertices,
            indices,
            normals: None,
            uvs: None,
            build_params: BvhBuildParams::default(),
            generation: 0,
            bvh: OnceLock::new(),
        })
    }

    /// Attaches per-vertex normals to this mesh.
    ///
    /// Ray hits on a mesh with normals report the normal interpolated at the hit point.
    pub fn with_normals(mut self, normals: Vec<Vector<Real>>) -> Result<Self, TriMeshBuilderError> {
        self.set_normals(Some(normals))?;
        Ok(self)
    }

    /// Attaches per-vertex texture coordinates to this mesh.
    pub fn with_uvs(mut self, uvs: Vec<TexCoord<Real>>) -> Result<Self, TriMeshBuilderError> {
        check_attribute_len("uvs", uvs.len(), self.vertices.len())?;
        self.uvs = Some(uvs);
        Ok(self)
    }

    /// Sets the parameters used when this mesh’s BVH is built lazily.
    pub fn with_build_params(mut self, params: BvhBuildParams) -> Self {
        self.build_params = params;
        self
    }

    /// The vertex buffer of this mesh.
    #[inline]
    pub fn vertices(&self) -> &[Point<Real>] {
        &self.vertices
    }

    /// The index buffer of this mesh.
    #[inline]
    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// The per-vertex normals of this mesh, if any.
    #[inline]
    pub fn normals(&self) -> Option<&[Vector<Real>]> {
        self.normals.as_deref()
    }

    /// The per-vertex texture coordinates of this mesh, if any.
    #[inline]
    pub fn uvs(&self) -> Option<&[TexCoord<Real>]> {
        self.uvs.as_deref()
    }

    /// The number of triangles of this mesh.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// The parameters used when this mesh’s BVH is built lazily.
    #[inline]
    pub fn build_params(&self) -> &BvhBuildParams {
        &self.build_params
    }

    /// Get the `i`-th triangle of this mesh.
    #[inline]
    pub fn triangle(&self, i: u32) -> Triangle {
        let idx = self.indices[i as usize];
        Triangle::new(
            self.vertices[idx[0] as usize],
            self.vertices[idx[1] as usize],
            self.vertices[idx[2] as usize],
        )
    }

    /// Iterates through all the triangles of this mesh.
    pub fn triangles(&self) -> impl ExactSizeIterator<Item = Triangle> + '_ {
        (0..self.indices.len() as u32).map(move |i| self.triangle(i))
    }

    /// The AABB of this mesh, in its local-space.
    ///
    /// Only the non-degenerate triangles are bounded: a NaN vertex or an unreferenced vertex
    /// doesn’t affect it. It is invalid if the mesh has no non-degenerate triangle.
    #[inline]
    pub fn local_aabb(&self) -> &Aabb {
        &self.local_aabb
    }

    /// The AABB of this mesh transformed by `pos`.
    #[inline]
    pub fn aabb(&self, pos: &Transform<Real>) -> Aabb {
        self.local_aabb.transform_by(pos)
    }

    /// The generation of the vertex buffer, incremented by every [`TriMesh::set_vertices`].
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the vertex positions of this mesh.
    ///
    /// The index buffer is kept. This is the only operation invalidating the cached BVH: it is
    /// rebuilt on the next ray cast. A BVH built from the previous positions (e.g. by a worker
    /// thread) is rejected by [`TriMesh::install_bvh`].
    pub fn set_vertices(&mut self, vertices: Vec<Point<Real>>) -> Result<(), TriMeshBuilderError> {
        check_indices(&self.indices, vertices.len())?;

        if let Some(normals) = &self.normals {
            check_attribute_len("normals", normals.len(), vertices.len())?;
        }

        if let Some(uvs) = &self.uvs {
            check_attribute_len("uvs", uvs.len(), vertices.len())?;
        }

        self.local_aabb = triangles_aabb(&vertices, &self.indices);
        self.vertices = vertices;
        self.generation += 1;
        self.invalidate_bvh();
        Ok(())
    }

    /// Replaces (or removes) the per-vertex normals of this mesh.
    ///
    /// Normals don’t affect the BVH, which is kept.
    pub fn set_normals(
        &mut self,
        normals: Option<Vec<Vector<Real>>>,
    ) -> Result<(), TriMeshBuilderError> {
        if let Some(normals) = &normals {
            check_attribute_len("normals", normals.len(), self.vertices.len())?;
        }

        self.normals = normals;
        Ok(())
    }

    /// Drops the cached BVH of this mesh.
    pub fn invalidate_bvh(&mut self) {
        let _ = self.bvh.take();
    }

    /// The BVH over the triangles of this mesh, built now if it isn’t cached yet.
    ///
    /// Concurrent callers block until the single build completes.
    pub fn bvh(&self) -> &MeshBvh {
        self.bvh
            .get_or_init(|| MeshBvh::build(self, &self.build_params))
    }

    /// The cached BVH of this mesh, if it was already built.
    #[inline]
    pub fn cached_bvh(&self) -> Option<&MeshBvh> {
        self.bvh.get()
    }

    /// Installs a BVH built with [`MeshBvh::build`].
    ///
    /// The BVH is handed back if it was built from another generation of the vertex buffer,
    /// or if this mesh already has a cached BVH.
    pub fn install_bvh(&self, bvh: MeshBvh) -> Result<(), MeshBvh> {
        if bvh.generation != self.generation {
            return Err(bvh);
        }

        self.bvh.set(bvh)
    }

    /// The number of degenerate triangles excluded from ray casts.
    ///
    /// This builds the BVH if it isn’t cached yet.
    pub fn skipped_triangle_count(&self) -> usize {
        self.bvh().skipped
    }

    /// The normal at the point with barycentric coordinates `(u, v)` on the triangle `i`,
    /// interpolated from the vertex normals.
    ///
    /// Returns `None` if the mesh has no normals or if the interpolated normal is zero.
    pub fn interpolated_normal(&self, i: u32, u: Real, v: Real) -> Option<Vector<Real>> {
        let normals = self.normals.as_ref()?;
        let idx = self.indices[i as usize];
        let normal = normals[idx[0] as usize] * (1.0 - u - v)
            + normals[idx[1] as usize] * u
            + normals[idx[2] as usize] * v;
        normal.try_normalize(0.0)
    }

    /// The texture coordinates at the point with barycentric coordinates `(u, v)` on the
    /// triangle `i`.
    ///
    /// Returns `None` if the mesh has no texture coordinates.
    pub fn interpolated_uv(&self, i: u32, u: Real, v: Real) -> Option<TexCoord<Real>> {
        let uvs = self.uvs.as_ref()?;
        let idx = self.indices[i as usize];
        Some(TexCoord::from(
            uvs[idx[0] as usize].coords * (1.0 - u - v)
                + uvs[idx[1] as usize].coords * u
                + uvs[idx[2] as usize].coords * v,
        ))
    }
}

/// The AABB of the non-degenerate triangles of a mesh with already checked indices.
fn triangles_aabb(vertices: &[Point<Real>], indices: &[[u32; 3]]) -> Aabb {
    indices
        .iter()
        .map(|idx| {
            Triangle::new(
                vertices[idx[0] as usize],
                vertices[idx[1] as usize],
                vertices[idx[2] as usize],
            )
        })
        .filter(|tri| !tri.is_degenerate())
        .fold(Aabb::new_invalid(), |acc, tri| acc.merged(&tri.local_aabb()))
}

fn check_indices(indices: &[[u32; 3]], num_vertices: usize) -> Result<(), TriMeshBuilderError> {
    for (triangle, idx) in indices.iter().enumerate() {
        if let Some(vertex) = idx.iter().find(|vid| **vid as usize >= num_vertices) {
            return Err(TriMeshBuilderError::IndexOutOfBounds {
                triangle,
                vertex: *vertex,
                num_vertices,
            });
        }
    }

    Ok(())
}

fn check_attribute_len(
    attribute: &'static str,
    len: usize,
    num_vertices: usize,
) -> Result<(), TriMeshBuilderError> {
    if len == num_vertices {
        Ok(())
    } else {
        Err(TriMeshBuilderError::AttributeLengthMismatch {
            attribute,
            len,
            num_vertices,
        })
    }
}
