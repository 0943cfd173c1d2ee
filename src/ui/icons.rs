pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const EYE: &str = "👀";
    pub const FILE: &str = "📄";
    pub const MOD: &str = "📝";
    pub const MAP: &str = "🗺️";
    pub const WRENCH: &str = "🔧";
}
