pub mod adaboost;
pub mod classifier_trait;
pub mod decision_tree;
pub mod estimator;
pub mod factory;
pub mod gbdt;
pub mod logistic;
pub mod random_forest;
pub mod search;
