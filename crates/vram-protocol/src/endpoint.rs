/// Paths a transport exposes for each operation. `{id}` is the resource id.
pub mod endpoints {
    pub const HEALTH: &str = "/";
    pub const RESOURCES: &str = "/api/resources";
    pub const RESOURCE: &str = "/api/resources/{id}";
    pub const RESOURCE_INFO: &str = "/api/resources/{id}/info";
    pub const RESOURCE_VERSION: &str = "/api/resources/{id}/version";
    pub const RESOURCE_DOWNLOAD: &str = "/api/resources/{id}/download";
    pub const STATS: &str = "/api/stats";

    /// Fill the `{id}` placeholder of a path template.
    pub fn resource_path(template: &str, id: &str) -> String {
        template.replace("{id}", id)
    }
}
