/// Generation of human-readable host labels and room names
use markov_namegen::{CharacterChainGenerator, RandomTextGenerator};
use rand::Rng;

/// Star and nebula names used to train the label generator
const TRAINING_NAMES: &[&str] = &[
    "Andromeda", "Antares", "Aldebaran", "Altair", "Arcturus", "Bellatrix", "Betelgeuse",
    "Canopus", "Capella", "Castor", "Deneb", "Electra", "Fomalhaut", "Hadar", "Izar",
    "Lyra", "Maia", "Merope", "Mira", "Mizar", "Nashira", "Orion", "Polaris", "Pollux",
    "Procyon", "Rigel", "Sirius", "Spica", "Taygeta", "Thuban", "Vega", "Zaurak",
    "Carina", "Helix", "Lagoon", "Rosette", "Tarantula", "Trifid", "Eagle", "Crab",
];

/// Longest label we accept from the generator
const MAX_LABEL_LEN: usize = 12;

fn label_generator() -> CharacterChainGenerator {
    CharacterChainGenerator::builder()
        .with_order(2)
        .with_prior(0.01)
        .train(TRAINING_NAMES.iter().copied())
        .build()
}

/// Generate a pronounceable label such as "Altrion" or "Capola"
///
/// Only alphanumeric labels of at most 12 characters are returned, so they
/// can be used anywhere a display name is expected.
pub fn generate_label() -> String {
    let mut generator = label_generator();
    loop {
        let name = generator.generate_one();
        if !name.is_empty()
            && name.len() <= MAX_LABEL_LEN
            && name.chars().all(char::is_alphanumeric)
        {
            return name;
        }
    }
}

/// Generate a label with a numeric suffix, e.g. "Vegan_417"
pub fn generate_unique_name() -> String {
    let suffix: u16 = rand::rng().random_range(0..1000);
    format!("{}_{}", generate_label(), suffix)
}
