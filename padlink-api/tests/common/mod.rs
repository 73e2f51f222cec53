pub mod mock_registry;
