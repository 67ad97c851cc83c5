//! ---
//! sp_section: "04-telemetry-export"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Telemetry queue, worker, and scrape endpoint."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{GaugeVec, Opts, Registry};

use crate::Sample;

/// Shared registry type used across proxy instances.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// The four gauges published per proxy instance.
///
/// Each gauge is labeled with the instance name so several proxies can
/// share one scrape endpoint without colliding.
#[derive(Clone)]
pub struct SampleMetrics {
    time_seconds: GaugeVec,
    input_u: GaugeVec,
    output_y: GaugeVec,
    parameter_k: GaugeVec,
}

impl SampleMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let time_seconds = GaugeVec::new(
            Opts::new("time_seconds", "Simulation time of the most recent step"),
            &["instance"],
        )?;
        registry.register(Box::new(time_seconds.clone()))?;

        let input_u = GaugeVec::new(
            Opts::new("input_u", "Input signal u as set by the orchestrator"),
            &["instance"],
        )?;
        registry.register(Box::new(input_u.clone()))?;

        let output_y = GaugeVec::new(
            Opts::new("output_y", "Output signal y computed by the inner engine"),
            &["instance"],
        )?;
        registry.register(Box::new(output_y.clone()))?;

        let parameter_k = GaugeVec::new(
            Opts::new("parameter_k", "Gain parameter k cached by the proxy"),
            &["instance"],
        )?;
        registry.register(Box::new(parameter_k.clone()))?;

        Ok(Self {
            time_seconds,
            input_u,
            output_y,
            parameter_k,
        })
    }

    /// Publish one sample as the latest values for an instance.
    pub fn record(&self, instance: &str, sample: &Sample) {
        self.time_seconds
            .with_label_values(&[instance])
            .set(sample.time);
        self.input_u
            .with_label_values(&[instance])
            .set(sample.input);
        self.output_y
            .with_label_values(&[instance])
            .set(sample.output);
        self.parameter_k
            .with_label_values(&[instance])
            .set(sample.gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_all_four_gauges() {
        let registry = new_registry();
        let metrics = SampleMetrics::new(&registry).expect("metrics register");
        metrics.record(
            "proxy-a",
            &Sample {
                time: 5.0,
                input: 4.0,
                output: 9.0,
                gain: 2.0,
            },
        );

        let families = registry.gather();
        assert_eq!(families.len(), 4);
        let output = families
            .iter()
            .find(|family| family.get_name() == "output_y")
            .expect("output gauge present");
        let metric = &output.get_metric()[0];
        assert_eq!(metric.get_label()[0].get_value(), "proxy-a");
        assert_eq!(metric.get_gauge().get_value(), 9.0);
    }

    #[test]
    fn later_samples_overwrite_earlier_ones() {
        let registry = new_registry();
        let metrics = SampleMetrics::new(&registry).expect("metrics register");
        for time in [1.0, 2.0, 3.0] {
            metrics.record(
                "proxy-a",
                &Sample {
                    time,
                    input: 0.0,
                    output: 0.0,
                    gain: 2.0,
                },
            );
        }
        let families = registry.gather();
        let time_family = families
            .iter()
            .find(|family| family.get_name() == "time_seconds")
            .expect("time gauge present");
        assert_eq!(time_family.get_metric()[0].get_gauge().get_value(), 3.0);
    }
}
