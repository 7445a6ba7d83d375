use candle_core::{DType, Module, Result, Tensor};
use candle_nn::{Linear, VarBuilder};

/// A single LSTM cell with separate input and recurrent projections.
///
/// Gate order in the projected `4 * hidden` dimension is input, forget,
/// cell, output.
#[derive(Debug, Clone)]
pub struct LstmCell {
    input_linearity: Linear,
    state_linearity: Linear,
    hidden_size: usize,
}

impl LstmCell {
    pub fn load(input_size: usize, hidden_size: usize, vb: VarBuilder) -> Result<Self> {
        let input_linearity =
            candle_nn::linear(input_size, 4 * hidden_size, vb.pp("input_linearity"))?;
        let state_linearity =
            candle_nn::linear_no_bias(hidden_size, 4 * hidden_size, vb.pp("state_linearity"))?;
        Ok(Self {
            input_linearity,
            state_linearity,
            hidden_size,
        })
    }

    /// One step. `x`: [batch, input], `h`/`c`: [batch, hidden].
    fn step(&self, x: &Tensor, h: &Tensor, c: &Tensor) -> Result<(Tensor, Tensor)> {
        let gates = self
            .input_linearity
            .forward(x)?
            .add(&self.state_linearity.forward(h)?)?;
        let gates = gates.chunk(4, 1)?;

        let input_gate = candle_nn::ops::sigmoid(&gates[0].contiguous()?)?;
        let forget_gate = candle_nn::ops::sigmoid(&gates[1].contiguous()?)?;
        let cell_input = gates[2].contiguous()?.tanh()?;
        let output_gate = candle_nn::ops::sigmoid(&gates[3].contiguous()?)?;

        let c = forget_gate.mul(c)?.add(&input_gate.mul(&cell_input)?)?;
        let h = output_gate.mul(&c.tanh()?)?;
        Ok((h, c))
    }

    /// Run over a padded sequence.
    ///
    /// `inputs`: [batch, seq_len, input], `mask`: [batch, seq_len] (f32).
    /// Padded steps neither update the state nor produce output, so running
    /// in reverse starts each row at its own last real token.
    pub fn run(&self, inputs: &Tensor, mask: &Tensor, reverse: bool) -> Result<Tensor> {
        let (batch, seq_len, _) = inputs.dims3()?;
        let mut h = Tensor::zeros((batch, self.hidden_size), DType::F32, inputs.device())?;
        let mut c = h.clone();

        let steps: Vec<usize> = if reverse {
            (0..seq_len).rev().collect()
        } else {
            (0..seq_len).collect()
        };

        let mut outputs = Vec::with_capacity(seq_len);
        for t in steps {
            let x = inputs.narrow(1, t, 1)?.squeeze(1)?;
            let keep_new = mask.narrow(1, t, 1)?;
            let keep_old = keep_new.affine(-1.0, 1.0)?;

            let (h_new, c_new) = self.step(&x, &h, &c)?;
            h = h_new
                .broadcast_mul(&keep_new)?
                .add(&h.broadcast_mul(&keep_old)?)?;
            c = c_new
                .broadcast_mul(&keep_new)?
                .add(&c.broadcast_mul(&keep_old)?)?;
            outputs.push(h.broadcast_mul(&keep_new)?);
        }

        if reverse {
            outputs.reverse();
        }
        Tensor::stack(&outputs, 1)
    }
}

/// Stacked bidirectional LSTM; each layer feeds `[forward; backward]` upward.
#[derive(Debug, Clone)]
pub struct StackedBiLstm {
    layers: Vec<(LstmCell, LstmCell)>,
    hidden_size: usize,
}

impl StackedBiLstm {
    pub fn load(
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let mut layers = Vec::with_capacity(num_layers);
        let mut layer_input = input_size;
        for idx in 0..num_layers {
            let layer_vb = vb.pp(format!("layers.{idx}"));
            let forward = LstmCell::load(layer_input, hidden_size, layer_vb.pp("forward"))?;
            let backward = LstmCell::load(layer_input, hidden_size, layer_vb.pp("backward"))?;
            layers.push((forward, backward));
            layer_input = 2 * hidden_size;
        }
        Ok(Self {
            layers,
            hidden_size,
        })
    }

    pub fn output_dim(&self) -> usize {
        2 * self.hidden_size
    }

    /// `inputs`: [batch, seq_len, input] -> [batch, seq_len, 2 * hidden].
    pub fn forward(&self, inputs: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let mut hidden = inputs.clone();
        for (forward, backward) in &self.layers {
            let fwd = forward.run(&hidden, mask, false)?;
            let bwd = backward.run(&hidden, mask, true)?;
            hidden = Tensor::cat(&[fwd, bwd], 2)?;
        }
        Ok(hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use candle_nn::VarMap;

    fn encoder(num_layers: usize) -> StackedBiLstm {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        StackedBiLstm::load(3, 4, num_layers, vb).unwrap()
    }

    fn inputs(batch: usize, seq_len: usize) -> Tensor {
        Tensor::randn(0f32, 1f32, (batch, seq_len, 3), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_output_shape() {
        let lstm = encoder(2);
        let x = inputs(2, 5);
        let mask = Tensor::ones((2, 5), DType::F32, &Device::Cpu).unwrap();
        let out = lstm.forward(&x, &mask).unwrap();
        assert_eq!(out.dims(), &[2, 5, 8]);
        assert_eq!(lstm.output_dim(), 8);
    }

    #[test]
    fn test_padding_does_not_change_real_positions() {
        let lstm = encoder(1);
        let x = inputs(1, 3);
        let full_mask = Tensor::ones((1, 3), DType::F32, &Device::Cpu).unwrap();
        let unpadded = lstm.forward(&x, &full_mask).unwrap();

        let padding = Tensor::randn(0f32, 1f32, (1, 2, 3), &Device::Cpu).unwrap();
        let padded_x = Tensor::cat(&[&x, &padding], 1).unwrap();
        let padded_mask =
            Tensor::new(&[[1f32, 1., 1., 0., 0.]], &Device::Cpu).unwrap();
        let padded = lstm.forward(&padded_x, &padded_mask).unwrap();

        let expected = unpadded.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let actual = padded
            .narrow(1, 0, 3)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-5, "{a} != {e}");
        }

        let tail = padded
            .narrow(1, 3, 2)
            .unwrap()
            .abs()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_eq!(tail, 0.0);
    }
}
