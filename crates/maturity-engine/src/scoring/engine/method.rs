use super::super::rule::{AggregationMethod, ScaleRange};

/// One entry fed into an aggregation: a score, its weight and the range it lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreInput {
    pub score: f64,
    pub weight: f64,
    pub range: ScaleRange,
}

type Aggregator = fn(&[ScoreInput], ScaleRange) -> f64;

impl AggregationMethod {
    fn aggregator(self) -> Aggregator {
        match self {
            AggregationMethod::Average => average,
            AggregationMethod::WeightedAverage => weighted_average,
            AggregationMethod::PercentageToScale => percentage_to_scale,
            AggregationMethod::Sum => sum,
            AggregationMethod::Median => median,
            AggregationMethod::Min => minimum,
            AggregationMethod::Max => maximum,
        }
    }

    /// Raw method result before clamping and rounding. `None` when there is nothing to aggregate.
    pub(crate) fn apply(self, inputs: &[ScoreInput], output: ScaleRange) -> Option<f64> {
        if inputs.is_empty() {
            return None;
        }
        Some((self.aggregator())(inputs, output))
    }
}

fn average(inputs: &[ScoreInput], _output: ScaleRange) -> f64 {
    inputs.iter().map(|input| input.score).sum::<f64>() / inputs.len() as f64
}

fn weighted_average(inputs: &[ScoreInput], _output: ScaleRange) -> f64 {
    let total_weight: f64 = inputs.iter().map(|input| input.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = inputs.iter().map(|input| input.score * input.weight).sum();
    weighted / total_weight
}

fn percentage_to_scale(inputs: &[ScoreInput], output: ScaleRange) -> f64 {
    let attainable: f64 = inputs.iter().map(|input| input.range.span()).sum();
    if attainable <= 0.0 {
        return output.min;
    }
    let attained: f64 = inputs
        .iter()
        .map(|input| input.score - input.range.min)
        .sum();
    output.from_fraction(attained / attainable)
}

fn sum(inputs: &[ScoreInput], _output: ScaleRange) -> f64 {
    inputs.iter().map(|input| input.score).sum()
}

fn median(inputs: &[ScoreInput], _output: ScaleRange) -> f64 {
    let mut scores: Vec<f64> = inputs.iter().map(|input| input.score).collect();
    scores.sort_by(f64::total_cmp);
    let mid = scores.len() / 2;
    if scores.len() % 2 == 0 {
        (scores[mid - 1] + scores[mid]) / 2.0
    } else {
        scores[mid]
    }
}

fn minimum(inputs: &[ScoreInput], _output: ScaleRange) -> f64 {
    inputs
        .iter()
        .map(|input| input.score)
        .fold(f64::INFINITY, f64::min)
}

fn maximum(inputs: &[ScoreInput], _output: ScaleRange) -> f64 {
    inputs
        .iter()
        .map(|input| input.score)
        .fold(f64::NEG_INFINITY, f64::max)
}
