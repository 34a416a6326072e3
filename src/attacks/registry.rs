//! @ai:module:intent Resolve configured (category, name, parameter) triples to transform invocations
//! @ai:module:layer domain
//! @ai:module:public_api AttackKind, AttackDescriptor, AttackCombination, AttackRegistry
//! @ai:module:stateless true

use crate::attacks::error::{AttackError, TransformError};
use crate::attacks::params::{Args, AttackParam, ParamSpec};
use crate::attacks::{compression, filtering, geometric, noise};
use crate::metrics::types::AttackCategory;
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;

/// @ai:intent Every registered transform, tagged with its category and declared signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackKind {
    Jpeg,
    GaussianNoise,
    SaltPepper,
    Speckle,
    Poisson,
    GaussianBlur,
    Median,
    MotionBlur,
    Rotation,
    Scaling,
    Cropping,
    Resize,
}

impl AttackKind {
    pub const ALL: [AttackKind; 12] = [
        AttackKind::Jpeg,
        AttackKind::GaussianNoise,
        AttackKind::SaltPepper,
        AttackKind::Speckle,
        AttackKind::Poisson,
        AttackKind::GaussianBlur,
        AttackKind::Median,
        AttackKind::MotionBlur,
        AttackKind::Rotation,
        AttackKind::Scaling,
        AttackKind::Cropping,
        AttackKind::Resize,
    ];

    pub fn category(&self) -> AttackCategory {
        match self {
            AttackKind::Jpeg => AttackCategory::Compression,
            AttackKind::GaussianNoise
            | AttackKind::SaltPepper
            | AttackKind::Speckle
            | AttackKind::Poisson => AttackCategory::Noise,
            AttackKind::GaussianBlur | AttackKind::Median | AttackKind::MotionBlur => {
                AttackCategory::Filtering
            }
            AttackKind::Rotation | AttackKind::Scaling | AttackKind::Cropping | AttackKind::Resize => {
                AttackCategory::Geometric
            }
        }
    }

    /// @ai:intent Name used in configuration and in record labels
    /// @ai:effects pure
    pub fn name(&self) -> &'static str {
        match self {
            AttackKind::Jpeg => "jpeg",
            AttackKind::GaussianNoise => "gaussian",
            AttackKind::SaltPepper => "salt_pepper",
            AttackKind::Speckle => "speckle",
            AttackKind::Poisson => "poisson",
            AttackKind::GaussianBlur => "gaussian_blur",
            AttackKind::Median => "median",
            AttackKind::MotionBlur => "motion",
            AttackKind::Rotation => "rotation",
            AttackKind::Scaling => "scaling",
            AttackKind::Cropping => "cropping",
            AttackKind::Resize => "resize",
        }
    }

    /// @ai:intent Declared parameters in order; a bare scalar binds to the first one
    /// @ai:effects pure
    pub fn params(&self) -> &'static [ParamSpec] {
        const JPEG: &[ParamSpec] = &[ParamSpec::new("quality", 95.0)];
        const GAUSSIAN: &[ParamSpec] = &[ParamSpec::new("mean", 0.0), ParamSpec::new("var", 0.01)];
        const SALT_PEPPER: &[ParamSpec] = &[
            ParamSpec::new("amount", 0.05),
            ParamSpec::new("salt_vs_pepper", 0.5),
        ];
        const SPECKLE: &[ParamSpec] = &[ParamSpec::new("var", 0.04)];
        const KERNEL: &[ParamSpec] = &[ParamSpec::new("kernel_size", 3.0)];
        const MOTION: &[ParamSpec] = &[ParamSpec::new("size", 5.0), ParamSpec::new("angle", 0.0)];
        const ROTATION: &[ParamSpec] = &[ParamSpec::new("angle", 5.0)];
        const SCALING: &[ParamSpec] = &[ParamSpec::new("scale_factor", 1.5)];
        const CROPPING: &[ParamSpec] = &[ParamSpec::new("percentage", 0.1)];
        const RESIZE: &[ParamSpec] = &[ParamSpec::required("size")];

        match self {
            AttackKind::Jpeg => JPEG,
            AttackKind::GaussianNoise => GAUSSIAN,
            AttackKind::SaltPepper => SALT_PEPPER,
            AttackKind::Speckle => SPECKLE,
            AttackKind::Poisson => &[],
            AttackKind::GaussianBlur | AttackKind::Median => KERNEL,
            AttackKind::MotionBlur => MOTION,
            AttackKind::Rotation => ROTATION,
            AttackKind::Scaling => SCALING,
            AttackKind::Cropping => CROPPING,
            AttackKind::Resize => RESIZE,
        }
    }

    /// @ai:intent Look up a registered (category, name) pair
    /// @ai:effects pure
    pub fn lookup(category: AttackCategory, name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.category() == category && k.name() == name)
    }

    /// @ai:intent Run the transform with bound arguments
    /// @ai:pre image is not mutated; a new buffer is returned
    /// @ai:effects pure
    pub fn apply(&self, image: &DynamicImage, args: &Args, rng: &mut StdRng) -> Result<DynamicImage, TransformError> {
        match self {
            AttackKind::Jpeg => compression::jpeg(image, args.int("quality")?),
            AttackKind::GaussianNoise => noise::gaussian(image, args.float("mean")?, args.float("var")?, rng),
            AttackKind::SaltPepper => noise::salt_pepper(
                image,
                args.float("amount")?,
                args.float("salt_vs_pepper")?,
                rng,
            ),
            AttackKind::Speckle => noise::speckle(image, args.float("var")?, rng),
            AttackKind::Poisson => noise::poisson(image, rng),
            AttackKind::GaussianBlur => filtering::gaussian_blur(image, args.int("kernel_size")?),
            AttackKind::Median => filtering::median(image, args.int("kernel_size")?),
            AttackKind::MotionBlur => filtering::motion_blur(image, args.int("size")?, args.float("angle")?),
            AttackKind::Rotation => geometric::rotation(image, args.float("angle")?),
            AttackKind::Scaling => geometric::scaling(image, args.float("scale_factor")?),
            AttackKind::Cropping => geometric::cropping(image, args.float("percentage")?),
            AttackKind::Resize => geometric::resize(image, args.size("size")?),
        }
    }
}

/// @ai:intent One expanded (category, name, parameter) entry from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AttackDescriptor {
    pub kind: AttackKind,
    pub param: AttackParam,
}

impl AttackDescriptor {
    pub fn category(&self) -> AttackCategory {
        self.kind.category()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// @ai:intent Parameter label recorded as `attack_params`
    /// @ai:effects pure
    pub fn params_label(&self) -> String {
        self.param.label(self.kind.params())
    }
}

/// @ai:intent One descriptor per category, applied in order
#[derive(Debug, Clone, PartialEq)]
pub struct AttackCombination {
    pub steps: Vec<AttackDescriptor>,
}

impl AttackCombination {
    /// @ai:intent Joined attack names, e.g. `jpeg+gaussian`
    /// @ai:effects pure
    pub fn name(&self) -> String {
        self.steps.iter().map(|d| d.name()).collect::<Vec<_>>().join("+")
    }

    /// @ai:intent Joined parameter labels in step order
    /// @ai:effects pure
    pub fn params_label(&self) -> String {
        self.steps
            .iter()
            .map(|d| d.params_label())
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// @ai:intent Registry dispatching attacks; noise RNGs are reseeded per invocation
#[derive(Debug, Clone, Default)]
pub struct AttackRegistry {
    seed: Option<u64>,
}

impl AttackRegistry {
    /// @ai:intent Create a registry; with a seed, noise attacks are reproducible
    /// @ai:effects pure
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// @ai:intent Resolve a category and attack name to a registered transform
    /// @ai:effects pure
    pub fn resolve(&self, category: &str, name: &str) -> Result<AttackKind, AttackError> {
        let cat = AttackCategory::from_config_key(category)
            .ok_or_else(|| AttackError::UnknownCategory(category.to_string()))?;
        AttackKind::lookup(cat, name).ok_or_else(|| AttackError::UnknownAttack {
            category: category.to_string(),
            name: name.to_string(),
        })
    }

    /// @ai:intent Resolve and invoke one attack on an image
    /// @ai:post scalar and equivalent keyword parameters produce identical output
    /// @ai:effects pure
    pub fn invoke(
        &self,
        image: &DynamicImage,
        category: &str,
        name: &str,
        param: &AttackParam,
    ) -> Result<DynamicImage, AttackError> {
        let kind = self.resolve(category, name)?;
        self.apply(image, &AttackDescriptor {
            kind,
            param: param.clone(),
        })
    }

    /// @ai:intent Invoke an already-resolved descriptor
    /// @ai:effects pure
    pub fn apply(&self, image: &DynamicImage, descriptor: &AttackDescriptor) -> Result<DynamicImage, AttackError> {
        let kind = descriptor.kind;
        Args::bind(kind.params(), &descriptor.param)
            .and_then(|args| kind.apply(image, &args, &mut self.rng()))
            .map_err(|source| AttackError::Failed {
                category: kind.category().to_string(),
                name: kind.name().to_string(),
                source,
            })
    }

    /// @ai:intent Apply every step of a combination sequentially
    /// @ai:effects pure
    pub fn apply_combination(
        &self,
        image: &DynamicImage,
        combination: &AttackCombination,
    ) -> Result<DynamicImage, AttackError> {
        let mut current = image.clone();
        for step in &combination.steps {
            current = self.apply(&current, step)?;
        }
        Ok(current)
    }

    /// @ai:intent Expand the `[attacks]` table into a flat descriptor list
    /// @ai:post unknown categories, unknown names and unusable parameters are warned about and skipped
    /// @ai:effects pure
    pub fn expand(&self, attacks: &toml::Table) -> Vec<AttackDescriptor> {
        let mut descriptors = Vec::new();

        for (category, entries) in attacks {
            let toml::Value::Table(entries) = entries else {
                warn!("Ignoring attack category '{}': expected a table", category);
                continue;
            };

            for (name, values) in entries {
                let kind = match self.resolve(category, name) {
                    Ok(kind) => kind,
                    Err(e) => {
                        warn!("Skipping attack: {}", e);
                        continue;
                    }
                };

                let values = match values {
                    toml::Value::Array(list) => list.as_slice(),
                    single => std::slice::from_ref(single),
                };

                for value in values {
                    let Some(param) = AttackParam::from_toml(value) else {
                        warn!("Skipping {}.{}: unsupported parameter {}", category, name, value);
                        continue;
                    };
                    if let Err(e) = Args::bind(kind.params(), &param) {
                        warn!("Skipping {}.{} with params {}: {}", category, name, value, e);
                        continue;
                    }
                    descriptors.push(AttackDescriptor { kind, param });
                }
            }
        }

        descriptors
    }

    /// @ai:intent Cartesian product choosing one descriptor per category
    /// @ai:post categories appear in first-appearance order within each combination
    /// @ai:effects pure
    pub fn combinations(descriptors: &[AttackDescriptor]) -> Vec<AttackCombination> {
        let mut groups: Vec<(AttackCategory, Vec<&AttackDescriptor>)> = Vec::new();
        for descriptor in descriptors {
            match groups.iter_mut().find(|(c, _)| *c == descriptor.category()) {
                Some((_, group)) => group.push(descriptor),
                None => groups.push((descriptor.category(), vec![descriptor])),
            }
        }

        if groups.is_empty() {
            return Vec::new();
        }

        let mut combos: Vec<Vec<AttackDescriptor>> = vec![Vec::new()];
        for (_, group) in &groups {
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    group.iter().map(move |d| {
                        let mut steps = prefix.clone();
                        steps.push((*d).clone());
                        steps
                    })
                })
                .collect();
        }

        combos
            .into_iter()
            .map(|steps| AttackCombination { steps })
            .collect()
    }
}
