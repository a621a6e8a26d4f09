pub mod view_mutation;

pub use view_mutation::ViewMutationResolver;
