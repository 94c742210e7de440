// Pure post-processing of one inference output: the toxicity scalar and the
// salient reason spans. Neither touches I/O.

pub mod salience;
pub mod toxicity;
