use std::env;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

use augur::{Network, Scaler, sliding_windows};
use rand::Rng;
use serde::Deserialize;

/// Run parameters. Every field may be omitted in the JSON file; the defaults
/// reproduce the built-in demo series.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ForecastConfig {
    series: Vec<f64>,
    window: usize,
    hidden: usize,
    horizon: usize,
    learning_rate: f64,
    momentum: f64,
    target_error: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            series: vec![
                2378.9, 2476.8, 2706.5, 2413.3, 2585.6, 2637.2, 2596.3, 2784.5, 2618.4, 2896.7,
                3035.3, 3266.3, 3304.2,
            ],
            window: 4,
            hidden: 9,
            horizon: 3,
            learning_rate: 0.25,
            momentum: 0.9,
            target_error: 0.001,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config: ForecastConfig = match env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path)?;
            serde_json::from_reader(BufReader::new(file))?
        }
        None => ForecastConfig::default(),
    };

    if config.series.len() < config.window + 2 {
        return Err(format!(
            "series has {} values, need at least {} for a window of {}",
            config.series.len(),
            config.window + 2,
            config.window
        )
        .into());
    }

    let scaler = Scaler::fit(&config.series);
    let scaled: Vec<f64> = config.series.iter().map(|&v| scaler.transform(v)).collect();
    let samples = sliding_windows(&scaled, config.window, config.horizon);

    let mut net = Network::new(
        config.window,
        config.hidden,
        config.horizon,
        config.learning_rate,
        config.momentum,
    );

    // The last window never enters the training draw
    let mut rng = rand::rng();
    let mut rounds: u64 = 0;
    loop {
        let idx = rng.random_range(0..samples.len() - 1);
        net.train(&samples[idx].input, &samples[idx].target)?;
        rounds += 1;
        println!("round {rounds}: error sum {:.6}", net.error_sum());
        if net.error_sum() <= config.target_error {
            break;
        }
    }
    println!("converged after {rounds} rounds");

    for (i, sample) in samples.iter().enumerate() {
        let output = net.infer(&sample.input)?;
        let predicted = scaler.untransform(output[output.len() - 1]);
        let actual = config.series[i + config.window];
        println!("sample {}: predicted {predicted:.1}, actual {actual:.1}", i + 1);
    }

    Ok(())
}
