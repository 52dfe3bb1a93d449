//! Ready-made skills for LowBot.
//!
//! - [`StaticSkill`]: answers one intent with a fixed reply per locale,
//!   declared in a [`SkillManifest`].
//! - [`FnSkill`]: predicate and handler supplied as closures.
//!
//! # Example
//!
//! ```rust
//! use lowbot_kernel::Skill;
//! use lowbot_skills::{SkillManifests, static_skills};
//!
//! let manifests = SkillManifests::from_toml_str(r#"
//!     [[skills]]
//!     name = "Greeter"
//!     intent = "greet"
//!     replies = { en = "Hey there!", fr = "Salut !" }
//! "#).unwrap();
//!
//! let skills = static_skills(manifests).unwrap();
//! assert_eq!(skills[0].info().name, "Greeter");
//! ```

use std::sync::Arc;

use lowbot_kernel::Skill;

pub mod error;
pub mod func;
pub mod manifest;
pub mod reply;

pub use error::{Result, SkillError};
pub use func::{FnSkill, help_skill};
pub use manifest::{SkillManifest, SkillManifests};
pub use reply::StaticSkill;

/// Turn manifests into skills, preserving their order.
pub fn static_skills(manifests: SkillManifests) -> Result<Vec<Arc<dyn Skill>>> {
    manifests
        .skills
        .into_iter()
        .map(|manifest| {
            let skill: Arc<dyn Skill> = Arc::new(StaticSkill::from_manifest(manifest)?);
            Ok(skill)
        })
        .collect()
}
