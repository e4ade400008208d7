pub mod bounding_box;
pub mod cell;
pub mod cell_face_geometry;
pub mod clustering;
pub mod cross_section;
pub mod element_mesh;
pub mod error;
pub mod fault;
pub mod geometry;
pub mod grid;
pub mod hex_intersect;
pub mod interval_filter;
pub mod nnc;
pub mod polygon;
pub mod results;

pub use bounding_box::{BoundingBox, BoundingBoxTree};
pub use cell::{
    cell_centroid, cell_twist_count, cell_volume, estimate_hex_overlap_with_box,
    point_cell_position, Cell, FaceType, PointCellPosition, ALL_FACES,
};
pub use cell_face_geometry::{
    calculate_cell_face_overlap, extract_polygon, face_pair_overlap, polygon_to_index_list,
    CellFaceOverlap,
};
pub use clustering::{
    find_start_cell, generate_clusters, generate_statistics, grow_cluster, ClusterStatistics,
    ClusteringInputs, ClusteringLimits, ClusteringResult,
};
pub use cross_section::{
    CrossSectionGenerator, CrossSectionGeometry, HexGridSource, ReservoirGridSource,
};
pub use element_mesh::{ElementMesh, ElementMeshSource, ElementType};
pub use error::GridError;
pub use fault::{CellRange, Fault, FaultFace, FaultsPerCellAccumulator};
pub use geometry::Plane;
pub use grid::{MainGrid, SubGrid};
pub use hex_intersect::{
    is_hex_intersected_by_plane, line_hex_intersection, plane_hex_intersection,
    plane_hex_intersection_polygons, CornerWeightedVertex,
};
pub use interval_filter::IntervalFilter;
pub use nnc::{Connection, ConnectionContainer, NncData, NncProcessingState};
pub use polygon::{
    clip_polyline_by_polygon, create_polygon_from_line_segments, point_inside_polygon_2d,
    polygon_intersection, polygon_subtraction, simplify_polyline, union_of_polygons, ClipZPolicy,
};
pub use results::{ActiveCellInfo, CaseCellResults, ResultAddress, ResultCategory};
