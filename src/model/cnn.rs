//! CNN architectures for the uncertainty experiments
//!
//! All three methods share one feature extractor ([`Backbone`]) and differ
//! only in their heads:
//! - [`Classifier`]: class logits, softmax at inference (ensemble member)
//! - [`EvidentialClassifier`]: softplus evidence for a Dirichlet output
//! - [`ConfidNetClassifier`]: class logits plus a sigmoid confidence head

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{
        activation::{sigmoid, softmax, softplus},
        backend::Backend,
        Tensor,
    },
};

use super::{ModelOutput, ProbabilisticClassifier};
use crate::uncertainty::DirichletParams;

/// Configuration shared by every head
#[derive(Config, Debug)]
pub struct CnnConfig {
    /// Number of output classes
    pub num_classes: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Filters of the first conv block; doubled in each following block
    #[config(default = "32")]
    pub base_filters: usize,

    /// Width of the feature vector fed to the heads
    #[config(default = "128")]
    pub hidden_units: usize,

    /// Dropout rate before the heads
    #[config(default = "0.3")]
    pub dropout_rate: f64,
}

/// Conv2d → BatchNorm → ReLU → 2×2 MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B>,
    relu: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        Self {
            conv,
            bn: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Feature extractor: three conv blocks, global average pooling, one
/// fully connected layer with dropout
///
/// Global pooling makes the extractor independent of the input resolution,
/// so the same architecture serves 32×32 CIFAR and 96×96 STL-10 images.
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    conv1: ConvBlock<B>,
    conv2: ConvBlock<B>,
    conv3: ConvBlock<B>,
    global_pool: AdaptiveAvgPool2d,
    fc: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> Backbone<B> {
    pub fn new(config: &CnnConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        Self {
            conv1: ConvBlock::new(config.in_channels, base, device),
            conv2: ConvBlock::new(base, base * 2, device),
            conv3: ConvBlock::new(base * 2, base * 4, device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: LinearConfig::new(base * 4, config.hidden_units).init(device),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
        }
    }

    /// `[batch, C, H, W]` → `[batch, hidden_units]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);

        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc.forward(x);
        let x = Relu::new().forward(x);
        self.dropout.forward(x)
    }
}

/// Plain softmax classifier, used as a Deep Ensemble member
#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    backbone: Backbone<B>,
    head: Linear<B>,
}

impl<B: Backend> Classifier<B> {
    pub fn new(config: &CnnConfig, device: &B::Device) -> Self {
        Self {
            backbone: Backbone::new(config, device),
            head: LinearConfig::new(config.hidden_units, config.num_classes).init(device),
        }
    }

    /// Class logits `[batch, K]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.head.forward(self.backbone.forward(images))
    }
}

impl<B: Backend> ProbabilisticClassifier<B> for Classifier<B> {
    fn predict(&self, images: Tensor<B, 4>) -> ModelOutput<B> {
        ModelOutput::from_probabilities(softmax(self.forward(images), 1))
    }
}

/// Evidential classifier with a softplus evidence head
#[derive(Module, Debug)]
pub struct EvidentialClassifier<B: Backend> {
    backbone: Backbone<B>,
    head: Linear<B>,
}

impl<B: Backend> EvidentialClassifier<B> {
    pub fn new(config: &CnnConfig, device: &B::Device) -> Self {
        Self {
            backbone: Backbone::new(config, device),
            head: LinearConfig::new(config.hidden_units, config.num_classes).init(device),
        }
    }

    /// Non-negative evidence `[batch, K]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softplus(self.head.forward(self.backbone.forward(images)), 1.0)
    }

    /// Dirichlet parameters for a batch of images
    pub fn dirichlet(&self, images: Tensor<B, 4>) -> DirichletParams<B> {
        DirichletParams::from_evidence(self.forward(images))
    }
}

impl<B: Backend> ProbabilisticClassifier<B> for EvidentialClassifier<B> {
    fn predict(&self, images: Tensor<B, 4>) -> ModelOutput<B> {
        let params = self.dirichlet(images);
        ModelOutput {
            probabilities: params.mean_belief(),
            confidence: None,
            vacuity: Some(params.vacuity()),
        }
    }
}

/// Classifier with an auxiliary ConfidNet confidence head
#[derive(Module, Debug)]
pub struct ConfidNetClassifier<B: Backend> {
    backbone: Backbone<B>,
    classifier: Linear<B>,
    confidence: Linear<B>,
}

impl<B: Backend> ConfidNetClassifier<B> {
    pub fn new(config: &CnnConfig, device: &B::Device) -> Self {
        Self {
            backbone: Backbone::new(config, device),
            classifier: LinearConfig::new(config.hidden_units, config.num_classes).init(device),
            confidence: LinearConfig::new(config.hidden_units, 1).init(device),
        }
    }

    /// Class logits `[batch, K]` and confidence `[batch]` in (0, 1)
    pub fn forward(&self, images: Tensor<B, 4>) -> (Tensor<B, 2>, Tensor<B, 1>) {
        let features = self.backbone.forward(images);
        let [batch_size, _] = features.dims();

        let logits = self.classifier.forward(features.clone());
        let confidence = sigmoid(self.confidence.forward(features)).reshape([batch_size]);

        (logits, confidence)
    }
}

impl<B: Backend> ProbabilisticClassifier<B> for ConfidNetClassifier<B> {
    fn predict(&self, images: Tensor<B, 4>) -> ModelOutput<B> {
        let (logits, confidence) = self.forward(images);
        ModelOutput {
            probabilities: softmax(logits, 1),
            confidence: Some(confidence),
            vacuity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn tiny_config(num_classes: usize) -> CnnConfig {
        CnnConfig::new(num_classes)
            .with_base_filters(4)
            .with_hidden_units(8)
    }

    fn images(batch: usize, size: usize) -> Tensor<TestBackend, 4> {
        Tensor::random(
            [batch, 3, size, size],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &Default::default(),
        )
    }

    #[test]
    fn test_backbone_is_resolution_independent() {
        let device = Default::default();
        let backbone = Backbone::<TestBackend>::new(&tiny_config(10), &device);

        assert_eq!(backbone.forward(images(2, 32)).dims(), [2, 8]);
        assert_eq!(backbone.forward(images(2, 96)).dims(), [2, 8]);
    }

    #[test]
    fn test_classifier_probabilities_sum_to_one() {
        let model = Classifier::<TestBackend>::new(&tiny_config(10), &Default::default());
        let output = model.predict(images(3, 32));

        assert_eq!(output.probabilities.dims(), [3, 10]);
        let probs = output.probabilities.into_data().to_vec::<f32>().unwrap();
        for row in probs.chunks(10) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
        assert!(output.confidence.is_none());
    }

    #[test]
    fn test_evidential_output_is_non_negative() {
        let model = EvidentialClassifier::<TestBackend>::new(&tiny_config(100), &Default::default());
        let evidence = model.forward(images(2, 32));

        assert_eq!(evidence.dims(), [2, 100]);
        let values = evidence.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&e| e >= 0.0));

        let output = model.predict(images(2, 32));
        let belief = output.probabilities.into_data().to_vec::<f32>().unwrap();
        for row in belief.chunks(100) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        }
        assert_eq!(output.vacuity.map(|v| v.dims()), Some([2]));
    }

    #[test]
    fn test_confidnet_confidence_in_unit_interval() {
        let model = ConfidNetClassifier::<TestBackend>::new(&tiny_config(10), &Default::default());
        let (logits, confidence) = model.forward(images(4, 32));

        assert_eq!(logits.dims(), [4, 10]);
        assert_eq!(confidence.dims(), [4]);
        let values = confidence.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&c| c > 0.0 && c < 1.0));
    }
}
