use crate::artifact::DataIngestionArtifact;
use crate::data_handling::{split_train_test, Table};
use crate::error::{PipelineError, Result};
use crate::io::csv_table::write_table;
use crate::layout::DataIngestionConfig;
use crate::source::DocumentSource;

pub struct DataIngestion<'a> {
    config: DataIngestionConfig,
    source: &'a dyn DocumentSource,
}

impl<'a> DataIngestion<'a> {
    pub fn new(config: DataIngestionConfig, source: &'a dyn DocumentSource) -> Self {
        Self { config, source }
    }

    /// Pull the whole collection and flatten it into a table.
    pub fn export_collection_as_table(&self) -> Result<Table> {
        log::info!(
            "Reading {}.{} from {}",
            self.config.database_name,
            self.config.collection_name,
            self.source.describe()
        );
        let documents = self
            .source
            .fetch(&self.config.database_name, &self.config.collection_name)?;
        if documents.is_empty() {
            return Err(PipelineError::data_format(format!(
                "collection {}.{} is empty",
                self.config.database_name, self.config.collection_name
            )));
        }
        Table::from_documents(&documents)
    }

    pub fn export_data_into_feature_store(&self, table: &Table) -> Result<()> {
        write_table(table, &self.config.feature_store_file_path)?;
        log::info!(
            "Feature store snapshot written to {}",
            self.config.feature_store_file_path.display()
        );
        Ok(())
    }

    pub fn split_data_as_train_test(&self, table: &Table) -> Result<(Table, Table)> {
        let (train, test) = split_train_test(
            table,
            self.config.train_test_split_ratio,
            self.config.split_seed,
        );
        log::info!(
            "Performed train test split: {} train rows, {} test rows",
            train.n_rows(),
            test.n_rows()
        );
        write_table(&train, &self.config.training_file_path)?;
        write_table(&test, &self.config.testing_file_path)?;
        Ok((train, test))
    }

    pub fn initiate_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        let table = self.export_collection_as_table()?;
        table.log_summary("Ingested table");
        self.export_data_into_feature_store(&table)?;
        self.split_data_as_train_test(&table)?;
        Ok(DataIngestionArtifact {
            trained_file_path: self.config.training_file_path.clone(),
            test_file_path: self.config.testing_file_path.clone(),
        })
    }
}
