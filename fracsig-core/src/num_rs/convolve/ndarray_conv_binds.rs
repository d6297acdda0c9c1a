use super::ConvolveMode;

impl<const N: usize> From<ConvolveMode> for ndarray_conv::ConvMode<N> {
    fn from(value: ConvolveMode) -> Self {
        match value {
            ConvolveMode::Full => ndarray_conv::ConvMode::Full,
            ConvolveMode::Valid => ndarray_conv::ConvMode::Valid,
            ConvolveMode::Same => ndarray_conv::ConvMode::Same,
        }
    }
}
