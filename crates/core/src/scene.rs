//! Scene descriptions used as image-generation prompts.

use rand::seq::IndexedRandom;

/// The fixed pool of scenes a round can be drawn from.
///
/// Every scene is limited to common A2-level vocabulary and contains no
/// people, so that learners can describe it with "There is / There are".
pub const SCENES: &[&str] = &[
    "A clear, well-lit photograph of a kitchen table set for breakfast for two. The scene should only contain objects and food items that are common A2-level English vocabulary (e.g., table, chair, plate, fork, knife, spoon, glass, cup, apple, banana, bread, milk, juice). The style should be realistic and easy for an English learner to understand. No people.",
    "A clear, sunny photograph of a dog park. The scene should only contain objects and animals that are common A2-level English vocabulary (e.g., dog, tree, ball, bench, grass, flower, water). There should be a few dogs of different colors. The style should be realistic and easy for an English learner to understand. No people.",
    "A clear, sunny photograph of a beach. The scene should only contain objects that are common A2-level English vocabulary (e.g., sand, sea, boat, shell, umbrella, chair, towel, sun, cloud). The style should be realistic and easy for an English learner to understand. No people.",
    "A clear photograph of a cozy living room. The scene should only contain objects that are common A2-level English vocabulary (e.g., sofa, table, lamp, book, window, picture, clock, rug, plant). The style should be realistic and easy for an English learner to understand. No people.",
    "A clear photograph of a simple city street. The scene should only contain objects that are common A2-level English vocabulary (e.g., car, bus, house, tree, street, sign, bicycle, building, shop). The style should be realistic and easy for an English learner to understand. No people.",
];

/// Chooses the scene description for the next round.
pub trait SceneSelector: Send + Sync {
    fn choose(&self) -> String;
}

/// Draws uniformly at random from [`SCENES`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomScene;

impl SceneSelector for RandomScene {
    fn choose(&self) -> String {
        SCENES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(SCENES[0])
            .to_string()
    }
}

/// Always returns the same scene. Useful for deterministic tests and demos.
#[derive(Debug, Clone)]
pub struct FixedScene(pub String);

impl SceneSelector for FixedScene {
    fn choose(&self) -> String {
        self.0.clone()
    }
}
