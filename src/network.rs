use thiserror::Error;

/// A sample handed to [`Network::train`] or [`Network::infer`] did not match
/// the sizes fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("input has {got} values, the network takes {want}")]
    InputLength { want: usize, got: usize },
    #[error("target has {got} values, the network produces {want}")]
    TargetLength { want: usize, got: usize },
}

/// A fully-connected input-hidden-output network with sigmoid units, trained
/// online by error backpropagation with a momentum term.
///
/// Index 0 of the input and hidden buffers is a fixed -1 bias feed; row 0 of
/// each weight matrix holds the matching bias weights and column 0 is never
/// touched. The real values live at indices `1..=count`. The layer sizes and
/// both hyperparameters are fixed for the life of the network.
pub struct Network {
    input: Vec<f64>,  // input[0] = -1, the hidden layer's bias feed
    hidden: Vec<f64>, // hidden[0] = -1, the output layer's bias feed
    output: Vec<f64>, // output[0] unused
    target: Vec<f64>, // target[0] unused
    input_to_hidden: Vec<Vec<f64>>,        // (inputs + 1) x (hidden + 1)
    hidden_to_output: Vec<Vec<f64>>,       // (hidden + 1) x (outputs + 1)
    input_to_hidden_delta: Vec<Vec<f64>>,  // previous update, momentum carrier
    hidden_to_output_delta: Vec<Vec<f64>>, // previous update, momentum carrier
    output_error: Vec<f64>,
    hidden_error: Vec<f64>,
    learning_rate: f64,
    momentum: f64,
    error_sum: f64,
}

impl Network {
    /// Builds a network with all input-to-hidden weights at 0 and the
    /// hidden-to-output weights alternating -1/+1 by source-row parity.
    /// The seed is deterministic: two fresh networks of the same shape are
    /// identical.
    pub fn new(
        input_count: usize,
        hidden_count: usize,
        output_count: usize,
        learning_rate: f64,
        momentum: f64,
    ) -> Self {
        assert!(
            input_count > 0 && hidden_count > 0 && output_count > 0,
            "every layer needs at least one unit"
        );

        let mut input = vec![0.0; input_count + 1];
        let mut hidden = vec![0.0; hidden_count + 1];
        input[0] = -1.0;
        hidden[0] = -1.0;

        let mut hidden_to_output = vec![vec![0.0; output_count + 1]; hidden_count + 1];
        for (i, row) in hidden_to_output.iter_mut().enumerate() {
            // Bias row included; column 0 stays at zero.
            for weight in row.iter_mut().skip(1) {
                *weight = if i % 2 == 0 { -1.0 } else { 1.0 };
            }
        }

        Network {
            input,
            hidden,
            output: vec![0.0; output_count + 1],
            target: vec![0.0; output_count + 1],
            input_to_hidden: vec![vec![0.0; hidden_count + 1]; input_count + 1],
            hidden_to_output,
            input_to_hidden_delta: vec![vec![0.0; hidden_count + 1]; input_count + 1],
            hidden_to_output_delta: vec![vec![0.0; output_count + 1]; hidden_count + 1],
            output_error: vec![0.0; output_count + 1],
            hidden_error: vec![0.0; hidden_count + 1],
            learning_rate,
            momentum,
            error_sum: 0.0,
        }
    }

    /// Runs one online training step: forward pass, error signals, weight
    /// update. The updated weights and [`Network::error_sum`] are the
    /// observable effects.
    pub fn train(&mut self, input: &[f64], target: &[f64]) -> Result<(), NetworkError> {
        self.check_input(input)?;
        if target.len() != self.target.len() - 1 {
            return Err(NetworkError::TargetLength {
                want: self.target.len() - 1,
                got: target.len(),
            });
        }

        self.input[1..].copy_from_slice(input);
        self.target[1..].copy_from_slice(target);

        self.forward();
        self.compute_error();
        self.update_weights();
        Ok(())
    }

    /// Runs the forward pass only and returns the output activations.
    /// Weights, error signals, and [`Network::error_sum`] are untouched.
    pub fn infer(&mut self, input: &[f64]) -> Result<Vec<f64>, NetworkError> {
        self.check_input(input)?;
        self.input[1..].copy_from_slice(input);

        self.forward();
        Ok(self.output[1..].to_vec())
    }

    /// Sum of absolute output-layer error signals from the most recent
    /// training step. Only meaningful right after [`Network::train`].
    pub fn error_sum(&self) -> f64 {
        self.error_sum
    }

    fn check_input(&self, input: &[f64]) -> Result<(), NetworkError> {
        if input.len() != self.input.len() - 1 {
            return Err(NetworkError::InputLength {
                want: self.input.len() - 1,
                got: input.len(),
            });
        }
        Ok(())
    }

    fn forward(&mut self) {
        propagate(&self.input, &mut self.hidden, &self.input_to_hidden);
        propagate(&self.hidden, &mut self.output, &self.hidden_to_output);
    }

    fn compute_error(&mut self) {
        self.error_sum = 0.0;

        // Sigmoid-derivative-weighted residual per output unit
        for i in 1..self.output.len() {
            self.output_error[i] =
                (self.target[i] - self.output[i]) * self.output[i] * (1.0 - self.output[i]);
            self.error_sum += self.output_error[i].abs();
        }

        // Backpropagated through the current hidden-to-output weights
        for i in 1..self.hidden.len() {
            self.hidden_error[i] = 0.0;
            for j in 1..self.output.len() {
                self.hidden_error[i] += self.output_error[j]
                    * self.hidden_to_output[i][j]
                    * self.hidden[i]
                    * (1.0 - self.hidden[i]);
            }
        }
    }

    // Must run after compute_error: the hidden error signal reads the
    // hidden-to-output weights as they stood before this update.
    fn update_weights(&mut self) {
        for i in 0..self.hidden.len() {
            for j in 1..self.output.len() {
                let delta = self.learning_rate * self.output_error[j] * self.hidden[i]
                    + self.momentum * self.hidden_to_output_delta[i][j];
                self.hidden_to_output[i][j] += delta;
                self.hidden_to_output_delta[i][j] = delta;
            }
        }

        for i in 0..self.input.len() {
            for j in 1..self.hidden.len() {
                let delta = self.learning_rate * self.hidden_error[j] * self.input[i]
                    + self.momentum * self.input_to_hidden_delta[i][j];
                self.input_to_hidden[i][j] += delta;
                self.input_to_hidden_delta[i][j] = delta;
            }
        }
    }
}

// Writes the weighted, sigmoid-squashed sums into dest[1..]; source[0] is the
// bias feed and dest[0] is never written.
fn propagate(source: &[f64], dest: &mut [f64], weights: &[Vec<f64>]) {
    for j in 1..dest.len() {
        let mut sum = 0.0;
        for (i, row) in weights.iter().enumerate() {
            sum += source[i] * row[j];
        }
        dest[j] = sigmoid(sum);
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn seed_weights_are_deterministic() {
        let net = Network::new(4, 9, 3, 0.25, 0.9);

        for row in &net.input_to_hidden {
            assert!(row.iter().all(|&w| w == 0.0));
        }
        for (i, row) in net.hidden_to_output.iter().enumerate() {
            let want = if i % 2 == 0 { -1.0 } else { 1.0 };
            for &w in &row[1..] {
                assert_eq!(w, want);
            }
        }
    }

    #[test]
    fn infer_is_a_pure_function_of_the_weights() {
        let mut net = Network::new(3, 5, 2, 0.1, 0.5);
        let input = [0.2, 0.4, 0.6];

        let first = net.infer(&input).unwrap();
        let second = net.infer(&input).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn sigmoid_stays_inside_the_open_unit_interval() {
        for x in [-500.0, -30.0, -1.0, 0.0, 1.0, 30.0, 500.0] {
            let y = sigmoid(x);
            assert!(y > 0.0 && y < 1.0, "sigmoid({x}) = {y}");
        }
    }

    #[test]
    fn mismatched_lengths_are_rejected_before_any_update() {
        let mut net = Network::new(4, 9, 3, 0.25, 0.9);
        let weights_before = net.hidden_to_output.clone();

        let err = net.train(&[0.1, 0.2], &[0.3; 3]).unwrap_err();
        assert_eq!(err, NetworkError::InputLength { want: 4, got: 2 });

        let err = net.train(&[0.1; 4], &[0.3; 5]).unwrap_err();
        assert_eq!(err, NetworkError::TargetLength { want: 3, got: 5 });

        let err = net.infer(&[0.1; 3]).unwrap_err();
        assert_eq!(err, NetworkError::InputLength { want: 4, got: 3 });

        assert_eq!(net.hidden_to_output, weights_before);
        assert_eq!(net.error_sum(), 0.0);
    }

    #[test]
    fn bias_feeds_survive_training() {
        let mut net = Network::new(2, 3, 2, 0.25, 0.9);
        net.train(&[0.3, 0.7], &[0.9, 0.1]).unwrap();
        net.infer(&[0.3, 0.7]).unwrap();

        assert_eq!(net.input[0], -1.0);
        assert_eq!(net.hidden[0], -1.0);
        assert_eq!(net.output[0], 0.0);
    }

    #[test]
    fn momentum_buffer_holds_the_last_applied_update() {
        let mut net = Network::new(2, 3, 2, 0.25, 0.9);
        let input = [0.3, 0.7];
        let target = [0.9, 0.1];

        // First step: the momentum term starts from zero
        let out_before = net.hidden_to_output.clone();
        let in_before = net.input_to_hidden.clone();
        net.train(&input, &target).unwrap();
        assert_delta_matches(&net.hidden_to_output, &out_before, &net.hidden_to_output_delta);
        assert_delta_matches(&net.input_to_hidden, &in_before, &net.input_to_hidden_delta);

        // Second step: the momentum term is carried from the first
        let out_before = net.hidden_to_output.clone();
        let in_before = net.input_to_hidden.clone();
        net.train(&input, &target).unwrap();
        assert_delta_matches(&net.hidden_to_output, &out_before, &net.hidden_to_output_delta);
        assert_delta_matches(&net.input_to_hidden, &in_before, &net.input_to_hidden_delta);
    }

    fn assert_delta_matches(after: &[Vec<f64>], before: &[Vec<f64>], delta: &[Vec<f64>]) {
        for i in 0..after.len() {
            for j in 1..after[i].len() {
                assert_relative_eq!(
                    delta[i][j],
                    after[i][j] - before[i][j],
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn training_on_one_pair_drives_the_error_down() {
        let mut net = Network::new(4, 9, 3, 0.25, 0.9);
        let input = [0.05; 4];
        let target = [0.95; 3];

        let mut rounds = 0;
        loop {
            net.train(&input, &target).unwrap();
            rounds += 1;
            if net.error_sum() <= 0.001 {
                break;
            }
            assert!(
                rounds < 10_000,
                "error sum stuck at {} after {rounds} rounds",
                net.error_sum()
            );
        }

        let output = net.infer(&input).unwrap();
        assert!(output.iter().all(|&o| o > 0.9), "outputs {output:?}");
    }
}
