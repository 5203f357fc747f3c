use ndarray::{concatenate, Array1, Array2, Axis};

use crate::artifact::{DataTransformationArtifact, DataValidationArtifact};
use crate::data_handling::remap_labels;
use crate::error::{ErrorKind, Result, ResultExt};
use crate::io::csv_table::read_table;
use crate::io::npy::save_array;
use crate::io::object::save_object;
use crate::layout::DataTransformationConfig;
use crate::preprocessing::Preprocessor;

pub struct DataTransformation {
    validation_artifact: DataValidationArtifact,
    config: DataTransformationConfig,
}

/// Append `y` as the last column of `x`.
pub fn stack_target(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
    concatenate(Axis(1), &[x.view(), y.view().insert_axis(Axis(1))])
        .or_kind(ErrorKind::DataFormat, || {
            format!("cannot stack {} labels onto {} rows", y.len(), x.nrows())
        })
}

impl DataTransformation {
    pub fn new(validation_artifact: DataValidationArtifact, config: DataTransformationConfig) -> Self {
        Self {
            validation_artifact,
            config,
        }
    }

    pub fn initiate_data_transformation(&self) -> Result<DataTransformationArtifact> {
        log::info!("Entered data transformation");
        let train = read_table(&self.validation_artifact.valid_train_file_path)?;
        let test = read_table(&self.validation_artifact.valid_test_file_path)?;

        let target = &self.config.target_column;
        let (train_features, train_target) = train.split_target(target)?;
        let (test_features, test_target) = test.split_target(target)?;
        let train_target = remap_labels(&train_target);
        let test_target = remap_labels(&test_target);

        // fitted on the training split only
        let preprocessor = Preprocessor::fit(&train_features, &self.config.imputer)?;
        let train_x = preprocessor.transform_table(&train_features)?;
        let test_x = preprocessor.transform_table(&test_features)?;
        log::info!(
            "Imputed {} train and {} test missing values",
            train_features.missing_count(),
            test_features.missing_count()
        );

        let train_arr = stack_target(&train_x, &train_target)?;
        let test_arr = stack_target(&test_x, &test_target)?;

        save_array(&train_arr, &self.config.transformed_train_file_path)?;
        save_array(&test_arr, &self.config.transformed_test_file_path)?;
        save_object(&preprocessor, &self.config.transformed_object_file_path)?;
        save_object(&preprocessor, &self.config.final_preprocessor_file_path)?;
        log::info!(
            "Saved {}x{} train and {}x{} test matrices",
            train_arr.nrows(),
            train_arr.ncols(),
            test_arr.nrows(),
            test_arr.ncols()
        );

        Ok(DataTransformationArtifact {
            transformed_object_file_path: self.config.transformed_object_file_path.clone(),
            transformed_train_file_path: self.config.transformed_train_file_path.clone(),
            transformed_test_file_path: self.config.transformed_test_file_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn target_is_the_last_column() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![0.0, 1.0];
        assert_eq!(
            stack_target(&x, &y).unwrap(),
            array![[1.0, 2.0, 0.0], [3.0, 4.0, 1.0]]
        );
        assert!(stack_target(&x, &array![1.0]).is_err());
    }
}
