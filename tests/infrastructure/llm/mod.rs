mod model_router_test;
mod openai_compatible_client_test;
