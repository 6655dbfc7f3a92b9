mod concurrent_queries;
mod frustum_culling;
mod mesh_bvh_lifecycle;
mod scene_ray_cast;
